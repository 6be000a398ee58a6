use clap::Subcommand;
use pomopro_core::Task;
use serde::Serialize;
use uuid::Uuid;

use super::{print_json, Workspace};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task name
        name: String,
    },
    /// List tasks as JSON
    List,
    /// Toggle a task's completion
    Toggle {
        /// Task ID (or a unique prefix)
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID (or a unique prefix)
        id: String,
    },
    /// Make a task the active one
    Activate {
        /// Task ID (or a unique prefix)
        id: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    active: bool,
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open()?;
    let mut engine = ws.engine()?;

    match action {
        TaskAction::Add { name } => {
            let task = ws
                .record
                .tasks
                .add(&name, chrono::Utc::now())
                .cloned()
                .ok_or("task name must not be empty")?;
            print_json(&task)?;
        }
        TaskAction::List => {
            let list = &ws.record.tasks;
            let views: Vec<_> = list
                .tasks
                .iter()
                .map(|task| TaskView {
                    task,
                    active: list.active_task_id == Some(task.id),
                })
                .collect();
            print_json(&views)?;
        }
        TaskAction::Toggle { id } => {
            let id = resolve(&ws, &id)?;
            let completed = ws.record.tasks.toggle(id);
            engine.record_task_completion(completed);
            println!("ok");
        }
        TaskAction::Delete { id } => {
            let id = resolve(&ws, &id)?;
            let completed = ws.record.tasks.delete(id);
            engine.record_task_completion(completed);
            println!("ok");
        }
        TaskAction::Activate { id } => {
            let id = resolve(&ws, &id)?;
            ws.record.tasks.set_active(Some(id));
            println!("ok");
        }
    }

    ws.save(&engine)
}

fn resolve(ws: &Workspace, id: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    ws.record
        .tasks
        .find(id)
        .map(|task| task.id)
        .ok_or_else(|| format!("no task matches '{id}'").into())
}
