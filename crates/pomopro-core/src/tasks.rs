//! The session's task list.
//!
//! Every toggle or delete returns the recomputed completed count, which the
//! caller hands to [`crate::StatsAggregator::record_task_completion`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub active_task_id: Option<Uuid>,
}

impl TaskList {
    /// Append a task. Blank names are ignored. The new task becomes active
    /// when no task is.
    pub fn add(&mut self, name: &str, now: DateTime<Utc>) -> Option<&Task> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let task = Task {
            id: Uuid::new_v4(),
            name: name.to_string(),
            completed: false,
            created_at: now,
        };
        if self.active_task_id.is_none() {
            self.active_task_id = Some(task.id);
        }
        self.tasks.push(task);
        self.tasks.last()
    }

    /// Flip a task's completion. Completing the active task moves activity
    /// to the first uncompleted task. Returns the completed count.
    pub fn toggle(&mut self, id: Uuid) -> u32 {
        let mut now_completed = false;
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
            now_completed = task.completed;
        }
        if now_completed && self.active_task_id == Some(id) {
            self.active_task_id = self.next_uncompleted();
        }
        self.completed_count()
    }

    /// Remove a task. Deleting the active task moves activity to the first
    /// uncompleted task. Returns the completed count.
    pub fn delete(&mut self, id: Uuid) -> u32 {
        self.tasks.retain(|t| t.id != id);
        if self.active_task_id == Some(id) {
            self.active_task_id = self.next_uncompleted();
        }
        self.completed_count()
    }

    /// Make `id` the active task. Returns false when no such task exists.
    pub fn set_active(&mut self, id: Option<Uuid>) -> bool {
        match id {
            Some(id) if !self.tasks.iter().any(|t| t.id == id) => false,
            _ => {
                self.active_task_id = id;
                true
            }
        }
    }

    pub fn active(&self) -> Option<&Task> {
        let id = self.active_task_id?;
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn completed_count(&self) -> u32 {
        self.tasks.iter().filter(|t| t.completed).count() as u32
    }

    /// Find a task by full id or by a unique id prefix.
    pub fn find(&self, id_or_prefix: &str) -> Option<&Task> {
        let mut matches = self
            .tasks
            .iter()
            .filter(|t| t.id.to_string().starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Some(task),
            _ => None,
        }
    }

    fn next_uncompleted(&self) -> Option<Uuid> {
        self.tasks.iter().find(|t| !t.completed).map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with(names: &[&str]) -> TaskList {
        let mut list = TaskList::default();
        for name in names {
            list.add(name, Utc::now());
        }
        list
    }

    #[test]
    fn first_task_becomes_active() {
        let list = list_with(&["write tests", "refactor"]);
        assert_eq!(list.active().unwrap().name, "write tests");
    }

    #[test]
    fn blank_names_are_ignored() {
        let mut list = TaskList::default();
        assert!(list.add("   ", Utc::now()).is_none());
        assert!(list.tasks.is_empty());
    }

    #[test]
    fn completing_active_task_moves_to_next_uncompleted() {
        let mut list = list_with(&["a", "b", "c"]);
        let a = list.tasks[0].id;
        assert_eq!(list.toggle(a), 1);
        assert_eq!(list.active().unwrap().name, "b");
    }

    #[test]
    fn reopening_task_keeps_activity_where_it_is() {
        let mut list = list_with(&["a", "b"]);
        let a = list.tasks[0].id;
        list.toggle(a);
        assert_eq!(list.toggle(a), 0);
        assert_eq!(list.active().unwrap().name, "b");
    }

    #[test]
    fn deleting_active_task_reassigns() {
        let mut list = list_with(&["a", "b"]);
        let b = list.tasks[1].id;
        list.toggle(b);
        let a = list.tasks[0].id;
        assert_eq!(list.delete(a), 1);
        assert!(list.active().is_none());
    }

    #[test]
    fn set_active_rejects_unknown_ids() {
        let mut list = list_with(&["a"]);
        assert!(!list.set_active(Some(Uuid::new_v4())));
        assert!(list.set_active(None));
        assert!(list.active().is_none());
    }

    #[test]
    fn find_accepts_unique_prefix() {
        let list = list_with(&["a", "b"]);
        let id = list.tasks[1].id.to_string();
        assert_eq!(list.find(&id[..8]).unwrap().name, "b");
        assert!(list.find("").is_none());
    }
}
