use time::OffsetDateTime;

use crate::domain::task::Task;

/// Decide whether a task should be highlighted as overdue.
/// Completed tasks never count, however old their due date.
pub fn is_overdue(task: &Task, now: OffsetDateTime) -> bool {
    !task.completed && task.due.is_some_and(|due| due < now)
}
