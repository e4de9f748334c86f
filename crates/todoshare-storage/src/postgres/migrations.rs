use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id          UUID PRIMARY KEY,
        email       TEXT NOT NULL UNIQUE,
        github_id   TEXT,
        role        TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lists (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        owner_id    UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        visibility  TEXT NOT NULL CHECK (visibility IN ('private', 'shared', 'public')),
        tags        TEXT[] NOT NULL DEFAULT '{}',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS list_access (
        list_id      UUID NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        user_id      UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        access_level TEXT NOT NULL,
        status       TEXT NOT NULL CHECK (status IN ('owner', 'pending', 'accepted')),
        PRIMARY KEY (list_id, user_id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_list_access_single_owner
        ON list_access (list_id) WHERE status = 'owner'
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_list_access_user_status
        ON list_access (user_id, status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS todos (
        id          UUID PRIMARY KEY,
        list_id     UUID NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        tags        TEXT[] NOT NULL DEFAULT '{}',
        completed   BOOLEAN NOT NULL DEFAULT false,
        due_date    TIMESTAMPTZ,
        start_date  TIMESTAMPTZ,
        priority    TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
        assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_todos_list_id ON todos (list_id)
    "#,
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = STATEMENTS.len(), "schema is up to date");
    Ok(())
}
