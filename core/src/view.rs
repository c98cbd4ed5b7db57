//! The derived view: a pure projection of the collection.

use std::fmt;
use std::str::FromStr;

use crate::types::Todo;

/// Which items the view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.complete,
            Filter::Completed => todo.complete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// Filter, then order by priority (1 first) with incomplete items ahead of
/// complete ones at the same priority. Remaining ties keep collection order.
pub fn project(todos: &[Todo], filter: Filter) -> Vec<&Todo> {
    let mut view: Vec<&Todo> = todos.iter().filter(|t| filter.matches(t)).collect();
    view.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.complete.cmp(&b.complete))
    });
    view
}

/// Item counts per filter, for the filter labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
}

pub fn counts(todos: &[Todo]) -> Counts {
    let completed = todos.iter().filter(|t| t.complete).count();
    Counts {
        all: todos.len(),
        active: todos.len() - completed,
        completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: i64, priority: u8, complete: bool) -> Todo {
        Todo {
            id,
            title: format!("todo {id}"),
            description: String::new(),
            priority,
            complete,
            owner_id: None,
        }
    }

    fn ids(view: &[&Todo]) -> Vec<i64> {
        view.iter().map(|t| t.id).collect()
    }

    #[test]
    fn orders_by_priority_then_incomplete_first() {
        let todos = vec![todo(1, 3, false), todo(2, 1, true), todo(3, 1, false)];
        assert_eq!(ids(&project(&todos, Filter::All)), vec![3, 2, 1]);
    }

    #[test]
    fn equal_keys_keep_collection_order() {
        let todos = vec![todo(4, 2, false), todo(1, 2, false), todo(9, 2, false)];
        assert_eq!(ids(&project(&todos, Filter::All)), vec![4, 1, 9]);
    }

    #[test]
    fn filters_select_by_completion() {
        let todos = vec![todo(1, 3, false), todo(2, 1, true), todo(3, 5, true)];
        assert_eq!(ids(&project(&todos, Filter::Active)), vec![1]);
        assert_eq!(ids(&project(&todos, Filter::Completed)), vec![2, 3]);
    }

    #[test]
    fn projection_leaves_collection_untouched() {
        let todos = vec![todo(1, 5, false), todo(2, 1, false)];
        let _ = project(&todos, Filter::All);
        let _ = project(&todos, Filter::All);
        assert_eq!(todos[0].id, 1);
    }

    #[test]
    fn counts_split_by_completion() {
        let todos = vec![todo(1, 3, false), todo(2, 1, true), todo(3, 1, false)];
        assert_eq!(
            counts(&todos),
            Counts {
                all: 3,
                active: 2,
                completed: 1
            }
        );
    }

    #[test]
    fn filter_parses_names() {
        assert_eq!("Active".parse::<Filter>().unwrap(), Filter::Active);
        assert_eq!("completed".parse::<Filter>().unwrap(), Filter::Completed);
        assert!("done".parse::<Filter>().is_err());
    }
}
