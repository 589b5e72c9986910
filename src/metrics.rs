use crate::api::{Comment, Discussion};
use crate::error::Result;

/// Mean hours between opening each item and the first comment by someone
/// other than its author, rounded to two decimals. Items without such a
/// reply are left out; `None` when no item has one.
pub fn average_response_hours<D, F>(items: &[D], mut comments: F) -> Result<Option<f64>>
where
    D: Discussion,
    F: FnMut(&str) -> Result<Vec<Comment>>,
{
    let mut total_hours = 0.0;
    let mut count = 0usize;
    for item in items {
        let thread = comments(item.comments_url())?;
        if let Some(hours) = first_reply_hours(item, &thread) {
            total_hours += hours;
            count += 1;
        }
    }
    if count == 0 {
        return Ok(None);
    }
    Ok(Some(round2(total_hours / count as f64)))
}

fn first_reply_hours<D: Discussion>(item: &D, thread: &[Comment]) -> Option<f64> {
    let author = item.author();
    let reply = thread
        .iter()
        .find(|c| c.user.is_some_and(|user| user != author))?;
    let elapsed = reply.created_at - item.opened_at();
    Some(elapsed.num_milliseconds() as f64 / 3_600_000.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
