use crate::error::AppError;
use crate::models::feedback::Feedback;
use crate::persistence::{key, read, write, HostedStore};

fn path(trip_id: &str, user_id: &str) -> Result<String, AppError> {
    Ok(format!("feedbacks/trips/{}/{}", key(trip_id)?, key(user_id)?))
}

pub async fn save_feedback(
    store: &dyn HostedStore,
    trip_id: &str,
    user_id: &str,
    feedback: &Feedback,
) -> Result<(), AppError> {
    write(store, &path(trip_id, user_id)?, feedback).await
}

pub async fn get_feedback(
    store: &dyn HostedStore,
    trip_id: &str,
    user_id: &str,
) -> Result<Feedback, AppError> {
    read(store, &path(trip_id, user_id)?)
        .await?
        .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))
}
