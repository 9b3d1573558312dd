use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use crate::error::AppResult;

const PRAGMAS: [&str; 3] =
    ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL", "PRAGMA foreign_keys=ON"];

pub async fn connect_and_migrate(
    options: impl Into<ConnectOptions>,
) -> AppResult<DatabaseConnection> {
    let options = options.into();
    let url = options.get_url().to_string();
    let db = Database::connect(options).await?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    tracing::debug!(url = %url, "database ready");
    Ok(db)
}

#[cfg(test)]
pub(crate) async fn test_db() -> DatabaseConnection {
    // Every pooled connection would otherwise open its own empty in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    connect_and_migrate(options).await.expect("in-memory database")
}

#[cfg(test)]
pub(crate) async fn insert_test_movie(
    db: &DatabaseConnection,
    tmdb_id: i32,
    title: &str,
    release_date: Option<&str>,
) -> crate::entities::movie::Model {
    use sea_orm::{ActiveModelTrait, Set};

    crate::entities::movie::ActiveModel {
        tmdb_id: Set(tmdb_id),
        title: Set(title.to_string()),
        poster_url: Set(None),
        backdrop_url: Set(None),
        release_date: Set(release_date.map(str::to_string)),
        overview: Set(String::new()),
        vote_average: Set(0.0),
        vote_count: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert movie")
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};

    use super::*;
    use crate::entities::{Sentiment, movie, movie_sentiment, review};

    #[tokio::test]
    async fn deleting_a_movie_cascades_to_reviews_and_aggregate() {
        let db = test_db().await;

        let movie = insert_test_movie(&db, 1, "Cascade", None).await;

        review::ActiveModel {
            movie_id: Set(movie.id),
            review_text: Set("fine".to_string()),
            sentiment: Set(Sentiment::Neutral),
            score: Set(0.5),
            source: Set("test".to_string()),
            created_at: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        crate::aggregator::recompute(&db, movie.id).await.unwrap();

        movie::Entity::delete_by_id(movie.id).exec(&db).await.unwrap();

        assert!(review::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(movie_sentiment::Entity::find().all(&db).await.unwrap().is_empty());
    }
}
