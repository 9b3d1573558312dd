use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(integer(Movies::TmdbId))
                    .col(string(Movies::Title))
                    .col(string_null(Movies::PosterUrl))
                    .col(string_null(Movies::BackdropUrl))
                    .col(string_null(Movies::ReleaseDate))
                    .col(text(Movies::Overview))
                    .col(double(Movies::VoteAverage))
                    .col(integer(Movies::VoteCount))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_tmdb_id")
                    .table(Movies::Table)
                    .col(Movies::TmdbId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_release_date")
                    .table(Movies::Table)
                    .col(Movies::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::MovieId))
                    .col(text(Reviews::ReviewText))
                    .col(string(Reviews::Sentiment))
                    .col(double(Reviews::Score))
                    .col(string(Reviews::Source))
                    .col(big_integer(Reviews::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_movie")
                            .from(Reviews::Table, Reviews::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_movie_created")
                    .table(Reviews::Table)
                    .col(Reviews::MovieId)
                    .col(Reviews::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieSentiments::Table)
                    .if_not_exists()
                    .col(integer(MovieSentiments::MovieId).primary_key())
                    .col(integer(MovieSentiments::PositiveCount))
                    .col(integer(MovieSentiments::NegativeCount))
                    .col(integer(MovieSentiments::NeutralCount))
                    .col(integer(MovieSentiments::TotalReviews))
                    .col(double(MovieSentiments::AverageScore))
                    .col(string(MovieSentiments::OverallSentiment))
                    .col(big_integer(MovieSentiments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_sentiments_movie")
                            .from(MovieSentiments::Table, MovieSentiments::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieSentiments::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Reviews::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    TmdbId,
    Title,
    PosterUrl,
    BackdropUrl,
    ReleaseDate,
    Overview,
    VoteAverage,
    VoteCount,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    MovieId,
    ReviewText,
    Sentiment,
    Score,
    Source,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MovieSentiments {
    Table,
    MovieId,
    PositiveCount,
    NegativeCount,
    NeutralCount,
    TotalReviews,
    AverageScore,
    OverallSentiment,
    UpdatedAt,
}
