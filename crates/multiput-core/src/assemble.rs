//! Part assembly: order the parts of every worker and finalize the session

use crate::store::{CompletedObject, CompletedPart, MultipartStore, UploadSession};
use crate::{Error, Result};
use tracing::debug;

/// Concatenate the per-worker part lists and sort them by part number
///
/// Part numbers map one-to-one onto chunk indices, so a duplicate can only
/// come from a broken plan and is reported as such.
pub fn order_parts<I>(part_lists: I) -> Result<Vec<CompletedPart>>
where
    I: IntoIterator<Item = Vec<CompletedPart>>,
{
    let mut parts: Vec<CompletedPart> = part_lists.into_iter().flatten().collect();
    parts.sort_by_key(|part| part.part_number);

    if let Some(pair) = parts
        .windows(2)
        .find(|pair| pair[0].part_number == pair[1].part_number)
    {
        return Err(Error::InvalidPlan(format!(
            "part {} was produced more than once",
            pair[0].part_number
        )));
    }

    Ok(parts)
}

/// Order the collected parts and submit them to the session's completion call
pub async fn assemble<I>(
    store: &dyn MultipartStore,
    session: &UploadSession,
    part_lists: I,
) -> Result<CompletedObject>
where
    I: IntoIterator<Item = Vec<CompletedPart>>,
{
    let parts = order_parts(part_lists)?;
    debug!(
        "completing multipart upload {} with {} parts",
        session.session_id,
        parts.len()
    );
    let object = store.complete_session(session, &parts).await?;
    Ok(object)
}
