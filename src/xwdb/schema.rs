pub const EARNED_BADGES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS EarnedBadges (
        player         TEXT        NOT NULL,
        badge_id       TEXT        NOT NULL,
        earned_at      TIMESTAMP   NOT NULL,

        UNIQUE (player, badge_id)
    )";

pub const CACHES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Caches (
        cache_name     TEXT        PRIMARY KEY
    )";

pub const CACHE_ENTRIES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS CacheEntries (
        cache_name     TEXT        NOT NULL    REFERENCES Caches(cache_name),
        url            TEXT        NOT NULL,

        status         INTEGER     NOT NULL,
        content_type   TEXT,
        body           BLOB        NOT NULL,
        fetched_at     TIMESTAMP   NOT NULL,

        PRIMARY KEY (cache_name, url)
    )";
