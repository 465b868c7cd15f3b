use planflow::db::{Database, ReplaceError};
use planflow::models::PlanEdit;
use planflow::plan::{coerce_object, validate_plan, PlanDraft};
use speculate2::speculate;
use uuid::Uuid;

const PLAN_JSON: &str = r#"{
    "title": "Warehouse Automation",
    "outcomes": [
        { "description": "Faster order fulfilment",
          "benefits": [
            { "description": "Lower cost per order",
              "deliverables": [
                { "description": "Conveyor control system",
                  "tasks": [
                    { "name": "Install conveyors", "responsible_team": "Operations",
                      "duration": 14 },
                    { "name": "Commission software", "responsible_team": "Engineering",
                      "duration": 7, "start_date": "2025-03-01", "end_date": "2025-03-08" }
                  ] }
              ] }
          ] },
        { "description": "Fewer picking errors",
          "benefits": [
            { "description": "Less rework",
              "deliverables": [
                { "description": "Barcode scanning", "tasks": [] }
              ] }
          ] }
    ]
}"#;

const REPLACEMENT_JSON: &str = r#"{
    "title": "Warehouse Robotics",
    "outcomes": [
        { "description": "Lights-out picking",
          "benefits": [
            { "description": "Round-the-clock throughput",
              "deliverables": [
                { "description": "Robot fleet",
                  "tasks": [
                    { "name": "Procure robots", "responsible_team": "Procurement",
                      "duration": 30 }
                  ] }
              ] }
          ] }
    ]
}"#;

fn draft(json: &str) -> PlanDraft {
    validate_plan(&coerce_object(json).expect("fixture parses")).expect("fixture validates")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        describe "create_project_with_tree" {
            it "persists the whole tree in one call" {
                let project = db.create_project_with_tree("Automate the warehouse", &draft(PLAN_JSON))
                    .expect("Failed to create project");

                assert_eq!(project.name, "Warehouse Automation");
                assert_eq!(project.vision, "Automate the warehouse");
                assert_eq!(project.revision, 0);

                let tree = db.get_project_with_tree(project.id).expect("Query failed").unwrap();
                assert_eq!(tree.outcomes.len(), 2);
                assert_eq!(tree.outcomes[0].benefits[0].deliverables[0].tasks.len(), 2);
            }

            it "round-trips validate, persist, serialize to an equivalent tree" {
                let original = draft(PLAN_JSON);
                let project = db.create_project_with_tree("vision", &original)
                    .expect("Failed to create project");

                let (_, serialized) = db.serialize_tree(project.id).expect("Query failed").unwrap();
                assert_eq!(serialized, original);
            }

            it "preserves task dates and durations" {
                let project = db.create_project_with_tree("vision", &draft(PLAN_JSON))
                    .expect("Failed to create project");

                let tasks = db.get_tasks(project.id).expect("Query failed");
                let dated = tasks.iter().find(|t| t.name == "Commission software").unwrap();
                assert_eq!(dated.duration_days, 7);
                assert_eq!(dated.start_date.unwrap().to_string(), "2025-03-01");
                assert_eq!(dated.end_date.unwrap().to_string(), "2025-03-08");
            }
        }

        describe "get_project" {
            it "returns None for non-existent project" {
                let result = db.get_project(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }
        }

        describe "delete_project" {
            it "cascades through the whole tree" {
                let project = db.create_project_with_tree("vision", &draft(PLAN_JSON))
                    .expect("Failed to create project");

                assert!(db.delete_project(project.id).expect("Failed to delete"));

                assert!(db.get_outcomes(project.id).expect("Query failed").is_empty());
                assert!(db.get_benefits(project.id).expect("Query failed").is_empty());
                assert!(db.get_deliverables(project.id).expect("Query failed").is_empty());
                assert!(db.get_tasks(project.id).expect("Query failed").is_empty());
            }

            it "returns false for non-existent project" {
                assert!(!db.delete_project(Uuid::new_v4()).expect("Query failed"));
            }
        }
    }

    describe "apply_edit" {
        it "updates the vision in place" {
            let project = db.create_project_with_tree("old vision", &draft(PLAN_JSON))
                .expect("Failed to create project");

            let applied = db.apply_edit(project.id, &PlanEdit::Vision {
                vision: "new vision".to_string(),
            }).expect("Edit failed");

            assert!(applied);
            let stored = db.get_project(project.id).expect("Query failed").unwrap();
            assert_eq!(stored.vision, "new vision");
            assert_eq!(stored.revision, 0);
        }

        it "updates one outcome description by id" {
            let project = db.create_project_with_tree("vision", &draft(PLAN_JSON))
                .expect("Failed to create project");
            let outcome_id = db.get_outcomes(project.id).expect("Query failed")[0].id;

            let applied = db.apply_edit(project.id, &PlanEdit::Outcome {
                id: outcome_id,
                description: "Same-day order fulfilment".to_string(),
            }).expect("Edit failed");

            assert!(applied);
            let outcomes = db.get_outcomes(project.id).expect("Query failed");
            assert_eq!(outcomes[0].description, "Same-day order fulfilment");
            assert_eq!(outcomes[1].description, "Fewer picking errors");
        }

        it "rejects a node id belonging to another project" {
            let first = db.create_project_with_tree("vision one", &draft(PLAN_JSON))
                .expect("Failed to create project");
            let second = db.create_project_with_tree("vision two", &draft(PLAN_JSON))
                .expect("Failed to create project");
            let foreign_benefit = db.get_benefits(first.id).expect("Query failed")[0].id;

            let applied = db.apply_edit(second.id, &PlanEdit::Benefit {
                id: foreign_benefit,
                description: "hijacked".to_string(),
            }).expect("Edit failed");

            assert!(!applied);
            let benefits = db.get_benefits(first.id).expect("Query failed");
            assert_eq!(benefits[0].description, "Lower cost per order");
        }
    }

    describe "replace_tree" {
        it "swaps the subtree, updates the name, and bumps the revision" {
            let project = db.create_project_with_tree("vision", &draft(PLAN_JSON))
                .expect("Failed to create project");

            let updated = db.replace_tree(project.id, 0, &draft(REPLACEMENT_JSON))
                .expect("Replace failed");

            assert_eq!(updated.name, "Warehouse Robotics");
            assert_eq!(updated.revision, 1);

            let tree = db.get_project_with_tree(project.id).expect("Query failed").unwrap();
            assert_eq!(tree.outcomes.len(), 1);
            assert_eq!(tree.outcomes[0].outcome.description, "Lights-out picking");
            // The old rows are gone entirely.
            assert_eq!(db.get_tasks(project.id).expect("Query failed").len(), 1);
        }

        it "rejects a stale revision and leaves the tree untouched" {
            let project = db.create_project_with_tree("vision", &draft(PLAN_JSON))
                .expect("Failed to create project");
            db.replace_tree(project.id, 0, &draft(REPLACEMENT_JSON)).expect("Replace failed");

            let err = db.replace_tree(project.id, 0, &draft(PLAN_JSON)).unwrap_err();
            assert!(matches!(err, ReplaceError::Conflict { expected: 0, actual: 1 }));

            let tree = db.get_project_with_tree(project.id).expect("Query failed").unwrap();
            assert_eq!(tree.project.name, "Warehouse Robotics");
            assert_eq!(tree.project.revision, 1);
        }

        it "reports a missing project" {
            let err = db.replace_tree(Uuid::new_v4(), 0, &draft(PLAN_JSON)).unwrap_err();
            assert!(matches!(err, ReplaceError::NotFound));
        }

        it "keeps serialization equivalent after repeated replacements" {
            let project = db.create_project_with_tree("vision", &draft(PLAN_JSON))
                .expect("Failed to create project");

            db.replace_tree(project.id, 0, &draft(REPLACEMENT_JSON)).expect("Replace failed");
            db.replace_tree(project.id, 1, &draft(PLAN_JSON)).expect("Replace failed");

            let (stored, serialized) = db.serialize_tree(project.id).expect("Query failed").unwrap();
            assert_eq!(stored.revision, 2);
            assert_eq!(serialized, draft(PLAN_JSON));
        }
    }
}
