use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => RepoError::unavailable(err),
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => RepoError::unavailable(err),
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request")
                || db.message().contains("canceling statement due to statement timeout") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        other => RepoError::from_persistence(other),
    }
}
