//! Schema bootstrap.
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements run at startup and by
//! `loopctl migrate`. Reference arrays of the document model (members, sounds,
//! tags, favorites) are join tables here.

use sqlx::PgPool;

/// Create all tables and indexes
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running schema setup...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            avatar TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sounds (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            bpm INTEGER NOT NULL CHECK (bpm BETWEEN 1 AND 999),
            duration DOUBLE PRECISION CHECK (duration IS NULL OR duration >= 0),
            description TEXT,
            sound_url TEXT,
            is_master_sound BOOLEAN NOT NULL DEFAULT FALSE,
            creator_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            description TEXT,
            creator_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            master_sound_id UUID REFERENCES sounds(id) ON DELETE SET NULL,
            is_fork BOOLEAN NOT NULL DEFAULT FALSE,
            parent_project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_sounds (
            project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            sound_id UUID NOT NULL REFERENCES sounds(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (project_id, sound_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_members (
            project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (project_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sound_tags (
            sound_id UUID NOT NULL REFERENCES sounds(id) ON DELETE CASCADE,
            tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (sound_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorite_sounds (
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            sound_id UUID NOT NULL REFERENCES sounds(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (user_id, sound_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorite_projects (
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (user_id, project_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    tracing::info!("Schema setup complete");
    Ok(())
}

async fn create_indexes(pool: &PgPool) -> Result<(), sqlx::Error> {
    const INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_sounds_creator ON sounds(creator_id)",
        "CREATE INDEX IF NOT EXISTS idx_sounds_created ON sounds(created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_projects_creator ON projects(creator_id)",
        "CREATE INDEX IF NOT EXISTS idx_projects_master ON projects(master_sound_id)",
        "CREATE INDEX IF NOT EXISTS idx_projects_parent ON projects(parent_project_id)",
        "CREATE INDEX IF NOT EXISTS idx_project_sounds_sound ON project_sounds(sound_id)",
        "CREATE INDEX IF NOT EXISTS idx_project_members_user ON project_members(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sound_tags_tag ON sound_tags(tag_id)",
    ];

    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
