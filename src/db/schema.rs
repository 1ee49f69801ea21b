use sqlx::PgPool;

/// Canonical items schema. `quantity` and `thumbnail` columns follow the
/// media-enabled shape; the thumbnail pair is either fully set or fully null.
const ITEMS_DDL: &str = "\
CREATE TABLE IF NOT EXISTS items (
    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    name text NOT NULL,
    description text NOT NULL,
    quantity integer NOT NULL CHECK (quantity >= 0),
    thumbnail_url text,
    thumbnail_public_id text,
    created_at timestamptz NOT NULL DEFAULT now(),
    updated_at timestamptz NOT NULL DEFAULT now(),
    CHECK ((thumbnail_url IS NULL) = (thumbnail_public_id IS NULL))
)";

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(ITEMS_DDL).execute(pool).await?;
    Ok(())
}
