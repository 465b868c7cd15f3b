mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;
use crate::plan::{BenefitDraft, DeliverableDraft, OutcomeDraft, PlanDraft, TaskDraft};

/// Errors from the transactional whole-tree replacement.
///
/// Everything else in this layer reports through `anyhow`; the replace step
/// is typed because callers must distinguish a stale revision from a missing
/// project.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("project not found")]
    NotFound,

    #[error("stale revision: expected {expected}, store has {actual}")]
    Conflict { expected: i64, actual: i64 },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "planflow")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("planflow.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, vision, revision, created_at, updated_at
             FROM projects ORDER BY created_at DESC",
        )?;

        let projects = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    vision: row.get(2)?,
                    revision: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    updated_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, vision, revision, created_at, updated_at
             FROM projects WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Project {
                id: parse_uuid(row.get::<_, String>(0)?),
                name: row.get(1)?,
                vision: row.get(2)?,
                revision: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
                updated_at: parse_datetime(row.get::<_, String>(5)?),
            }))
        } else {
            Ok(None)
        }
    }

    /// Create a project and its full plan tree in one transaction.
    ///
    /// The project name comes from the draft title; the vision is what the
    /// user submitted. Used by first-time generation only.
    pub fn create_project_with_tree(&self, vision: &str, draft: &PlanDraft) -> Result<Project> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO projects (id, name, vision, revision, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?)",
            (
                id.to_string(),
                &draft.title,
                vision,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;
        insert_tree(&tx, id, draft)?;
        tx.commit()?;

        Ok(Project {
            id,
            name: draft.title.clone(),
            vision: vision.to_string(),
            revision: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Leaf edits
    // ============================================================

    /// Apply the single leaf edit that precedes a reconciliation.
    ///
    /// Node edits are scoped to the project so an id from another tree cannot
    /// be reached. Returns false when the target does not exist.
    pub fn apply_edit(&self, project_id: Uuid, edit: &PlanEdit) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().to_rfc3339();
        let rows = match edit {
            PlanEdit::Vision { vision } => conn.execute(
                "UPDATE projects SET vision = ?, updated_at = ? WHERE id = ?",
                (vision, &now, project_id.to_string()),
            )?,
            PlanEdit::Outcome { id, description } => conn.execute(
                "UPDATE outcomes SET description = ? WHERE id = ? AND project_id = ?",
                (description, id.to_string(), project_id.to_string()),
            )?,
            PlanEdit::Benefit { id, description } => conn.execute(
                "UPDATE benefits SET description = ? WHERE id = ? AND outcome_id IN
                 (SELECT id FROM outcomes WHERE project_id = ?)",
                (description, id.to_string(), project_id.to_string()),
            )?,
            PlanEdit::Deliverable { id, description } => conn.execute(
                "UPDATE deliverables SET description = ? WHERE id = ? AND benefit_id IN
                 (SELECT b.id FROM benefits b
                  JOIN outcomes o ON o.id = b.outcome_id
                  WHERE o.project_id = ?)",
                (description, id.to_string(), project_id.to_string()),
            )?,
        };
        Ok(rows > 0)
    }

    // ============================================================
    // Tree reads
    // ============================================================

    pub fn get_outcomes(&self, project_id: Uuid) -> Result<Vec<Outcome>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, description, position
             FROM outcomes WHERE project_id = ? ORDER BY position",
        )?;
        let outcomes = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Outcome {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_id: parse_uuid(row.get::<_, String>(1)?),
                    description: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(outcomes)
    }

    pub fn get_benefits(&self, project_id: Uuid) -> Result<Vec<Benefit>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT b.id, b.outcome_id, b.description, b.position
             FROM benefits b
             JOIN outcomes o ON o.id = b.outcome_id
             WHERE o.project_id = ? ORDER BY b.position",
        )?;
        let benefits = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Benefit {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    outcome_id: parse_uuid(row.get::<_, String>(1)?),
                    description: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(benefits)
    }

    pub fn get_deliverables(&self, project_id: Uuid) -> Result<Vec<Deliverable>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT d.id, d.benefit_id, d.description, d.position
             FROM deliverables d
             JOIN benefits b ON b.id = d.benefit_id
             JOIN outcomes o ON o.id = b.outcome_id
             WHERE o.project_id = ? ORDER BY d.position",
        )?;
        let deliverables = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Deliverable {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    benefit_id: parse_uuid(row.get::<_, String>(1)?),
                    description: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deliverables)
    }

    pub fn get_tasks(&self, project_id: Uuid) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT t.id, t.deliverable_id, t.name, t.responsible_team, t.duration_days,
                    t.start_date, t.end_date, t.position
             FROM tasks t
             JOIN deliverables d ON d.id = t.deliverable_id
             JOIN benefits b ON b.id = d.benefit_id
             JOIN outcomes o ON o.id = b.outcome_id
             WHERE o.project_id = ? ORDER BY t.position",
        )?;
        let tasks = stmt
            .query_map([project_id.to_string()], map_task_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// The full plan tree for a project, or None if the project is missing.
    pub fn get_project_with_tree(&self, id: Uuid) -> Result<Option<ProjectWithTree>> {
        let project = match self.get_project(id)? {
            Some(p) => p,
            None => return Ok(None),
        };

        let outcomes = self.get_outcomes(id)?;
        let benefits = self.get_benefits(id)?;
        let deliverables = self.get_deliverables(id)?;
        let tasks = self.get_tasks(id)?;

        // Group children by parent id, then assemble bottom-up.
        let mut tasks_by_deliverable: HashMap<Uuid, Vec<Task>> = HashMap::new();
        for task in tasks {
            if let Some(did) = task.deliverable_id {
                tasks_by_deliverable.entry(did).or_default().push(task);
            }
        }

        let mut deliverables_by_benefit: HashMap<Uuid, Vec<DeliverableNode>> = HashMap::new();
        for d in deliverables {
            let node = DeliverableNode {
                tasks: tasks_by_deliverable.remove(&d.id).unwrap_or_default(),
                deliverable: d,
            };
            deliverables_by_benefit
                .entry(node.deliverable.benefit_id)
                .or_default()
                .push(node);
        }

        let mut benefits_by_outcome: HashMap<Uuid, Vec<BenefitNode>> = HashMap::new();
        for b in benefits {
            let node = BenefitNode {
                deliverables: deliverables_by_benefit.remove(&b.id).unwrap_or_default(),
                benefit: b,
            };
            benefits_by_outcome
                .entry(node.benefit.outcome_id)
                .or_default()
                .push(node);
        }

        let outcome_nodes = outcomes
            .into_iter()
            .map(|o| OutcomeNode {
                benefits: benefits_by_outcome.remove(&o.id).unwrap_or_default(),
                outcome: o,
            })
            .collect();

        Ok(Some(ProjectWithTree {
            project,
            outcomes: outcome_nodes,
        }))
    }

    /// Serialize the stored tree to the canonical nested draft shape used in
    /// prompts and responses.
    pub fn serialize_tree(&self, id: Uuid) -> Result<Option<(Project, PlanDraft)>> {
        let Some(tree) = self.get_project_with_tree(id)? else {
            return Ok(None);
        };

        let outcomes = tree
            .outcomes
            .iter()
            .map(|o| OutcomeDraft {
                description: o.outcome.description.clone(),
                benefits: o
                    .benefits
                    .iter()
                    .map(|b| BenefitDraft {
                        description: b.benefit.description.clone(),
                        deliverables: b
                            .deliverables
                            .iter()
                            .map(|d| DeliverableDraft {
                                description: d.deliverable.description.clone(),
                                tasks: d
                                    .tasks
                                    .iter()
                                    .map(|t| TaskDraft {
                                        name: t.name.clone(),
                                        responsible_team: t.responsible_team.clone(),
                                        duration: t.duration_days,
                                        start_date: t.start_date,
                                        end_date: t.end_date,
                                    })
                                    .collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let draft = PlanDraft {
            title: tree.project.name.clone(),
            outcomes,
        };
        Ok(Some((tree.project, draft)))
    }

    // ============================================================
    // Whole-tree replacement
    // ============================================================

    /// Atomically replace a project's entire plan tree.
    ///
    /// Runs in one transaction: re-reads the stored revision and rejects the
    /// write if it no longer matches `expected_revision`, deletes the whole
    /// subtree, recreates it from the draft, updates the project name from
    /// the draft title, and bumps the revision. On any error the transaction
    /// rolls back and readers keep seeing the old tree.
    pub fn replace_tree(
        &self,
        project_id: Uuid,
        expected_revision: i64,
        draft: &PlanDraft,
    ) -> Result<Project, ReplaceError> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let (actual, vision, created_at): (i64, String, String) = {
            let mut stmt =
                tx.prepare("SELECT revision, vision, created_at FROM projects WHERE id = ?")?;
            let mut rows = stmt.query([project_id.to_string()])?;
            match rows.next()? {
                Some(row) => (row.get(0)?, row.get(1)?, row.get(2)?),
                None => return Err(ReplaceError::NotFound),
            }
        };
        if actual != expected_revision {
            return Err(ReplaceError::Conflict {
                expected: expected_revision,
                actual,
            });
        }

        // Cascades through benefits, deliverables, and tasks.
        tx.execute(
            "DELETE FROM outcomes WHERE project_id = ?",
            [project_id.to_string()],
        )?;

        let now = Utc::now();
        let revision = actual + 1;
        tx.execute(
            "UPDATE projects SET name = ?, revision = ?, updated_at = ? WHERE id = ?",
            (
                &draft.title,
                revision,
                now.to_rfc3339(),
                project_id.to_string(),
            ),
        )?;
        insert_tree(&tx, project_id, draft)?;
        tx.commit()?;

        Ok(Project {
            id: project_id,
            name: draft.title.clone(),
            vision,
            revision,
            created_at: parse_datetime(created_at),
            updated_at: now,
        })
    }
}

/// Insert a draft tree under a project. Caller owns the transaction.
fn insert_tree(tx: &Transaction<'_>, project_id: Uuid, draft: &PlanDraft) -> rusqlite::Result<()> {
    for (oi, outcome) in draft.outcomes.iter().enumerate() {
        let outcome_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO outcomes (id, project_id, description, position) VALUES (?, ?, ?, ?)",
            (
                outcome_id.to_string(),
                project_id.to_string(),
                &outcome.description,
                oi as i64,
            ),
        )?;
        for (bi, benefit) in outcome.benefits.iter().enumerate() {
            let benefit_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO benefits (id, outcome_id, description, position) VALUES (?, ?, ?, ?)",
                (
                    benefit_id.to_string(),
                    outcome_id.to_string(),
                    &benefit.description,
                    bi as i64,
                ),
            )?;
            for (di, deliverable) in benefit.deliverables.iter().enumerate() {
                let deliverable_id = Uuid::new_v4();
                tx.execute(
                    "INSERT INTO deliverables (id, benefit_id, description, position)
                     VALUES (?, ?, ?, ?)",
                    (
                        deliverable_id.to_string(),
                        benefit_id.to_string(),
                        &deliverable.description,
                        di as i64,
                    ),
                )?;
                for (ti, task) in deliverable.tasks.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO tasks (id, deliverable_id, name, responsible_team,
                                            duration_days, start_date, end_date, position)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                        (
                            Uuid::new_v4().to_string(),
                            deliverable_id.to_string(),
                            &task.name,
                            &task.responsible_team,
                            task.duration,
                            task.start_date.map(|d| d.to_string()),
                            task.end_date.map(|d| d.to_string()),
                            ti as i64,
                        ),
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        deliverable_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
        name: row.get(2)?,
        responsible_team: row.get(3)?,
        duration_days: row.get(4)?,
        start_date: row.get::<_, Option<String>>(5)?.and_then(parse_date),
        end_date: row.get::<_, Option<String>>(6)?.and_then(parse_date),
        position: row.get(7)?,
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}
