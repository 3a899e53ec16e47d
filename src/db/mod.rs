mod schema;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::models::*;
use crate::timelapse::DataProvider;

/// SQLite store of registered games, their stars and ownership history.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    /// Drop every table and recreate the schema.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::drop_all(&conn)?;
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Game operations
    // ============================================================

    pub fn create_game(&self, input: CreateGameInput) -> Result<Game> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO games (id, api_key, name, close_date) VALUES (?, ?, ?, ?)",
            (
                input.id,
                &input.api_key,
                &input.name,
                input.close_date.map(|d| d.to_rfc3339()),
            ),
        )
        .with_context(|| format!("Failed to register game {}", input.id))?;

        Ok(Game {
            id: input.id,
            name: input.name,
            api_key: input.api_key,
            close_date: input.close_date,
        })
    }

    pub fn get_game(&self, id: GameId) -> Result<Option<Game>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let game = conn
            .query_row(
                "SELECT id, api_key, name, close_date FROM games WHERE id = ?",
                [id],
                |row| {
                    Ok(Game {
                        id: row.get(0)?,
                        api_key: row.get(1)?,
                        name: row.get(2)?,
                        close_date: row.get::<_, Option<String>>(3)?.and_then(parse_datetime),
                    })
                },
            )
            .optional()?;
        Ok(game)
    }

    /// All games with the tick range of their ownership records.
    pub fn list_games(&self) -> Result<Vec<GameSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT g.id, g.api_key, g.name, g.close_date, MIN(o.tick), MAX(o.tick)
             FROM games g LEFT JOIN owners o ON o.game_id = g.id
             GROUP BY g.id ORDER BY g.id",
        )?;

        let games = stmt
            .query_map([], |row| {
                Ok(GameSummary {
                    game: Game {
                        id: row.get(0)?,
                        api_key: row.get(1)?,
                        name: row.get(2)?,
                        close_date: row.get::<_, Option<String>>(3)?.and_then(parse_datetime),
                    },
                    first_tick: row.get(4)?,
                    last_tick: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(games)
    }

    /// Delete a game together with its stars and ownership history.
    pub fn delete_game(&self, id: GameId) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM games WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Star operations
    // ============================================================

    pub fn add_stars(&self, game_id: GameId, stars: &[Star]) -> Result<usize> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO stars (game_id, id, x, y) VALUES (?, ?, ?, ?)")?;
            for star in stars {
                stmt.execute((game_id, star.id, star.x, star.y))
                    .with_context(|| format!("Failed to add star {} to game {}", star.id, game_id))?;
            }
        }
        tx.commit()?;
        Ok(stars.len())
    }

    pub fn get_stars(&self, game_id: GameId) -> Result<Vec<Star>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT id, x, y FROM stars WHERE game_id = ? ORDER BY id")?;
        let stars = stmt
            .query_map([game_id], |row| Ok(Star::new(row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stars)
    }

    // ============================================================
    // Ownership operations
    // ============================================================

    /// Record ownership changes for one tick, replacing earlier records for the same star and tick.
    pub fn record_owners(&self, game_id: GameId, tick: Tick, owners: &[(StarId, Owner)]) -> Result<usize> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO owners (game_id, star_id, tick, player) VALUES (?, ?, ?, ?)",
            )?;
            for (star_id, owner) in owners {
                stmt.execute((game_id, star_id, tick, owner.player()))
                    .with_context(|| format!("Failed to record owner of star {star_id} at tick {tick}"))?;
            }
        }
        tx.commit()?;
        Ok(owners.len())
    }

    pub fn get_tick_range(&self, game_id: GameId) -> Result<Option<(Tick, Tick)>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let range = conn.query_row(
            "SELECT MIN(tick), MAX(tick) FROM owners WHERE game_id = ?",
            [game_id],
            |row| Ok((row.get::<_, Option<Tick>>(0)?, row.get::<_, Option<Tick>>(1)?)),
        )?;
        Ok(match range {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        })
    }

    pub fn get_owners_at(&self, game_id: GameId, tick: Tick) -> Result<Vec<OwnershipEvent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT star_id, player FROM owners WHERE game_id = ? AND tick = ? ORDER BY star_id",
        )?;
        let events = stmt
            .query_map((game_id, tick), |row| {
                let player: Option<PlayerId> = row.get(1)?;
                Ok(OwnershipEvent::new(tick, row.get(0)?, Owner::from(player)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    // ============================================================
    // Import / export
    // ============================================================

    /// Register a game from its JSON document in a single transaction.
    pub fn import_game(&self, export: &GameExport) -> Result<Game> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO games (id, api_key, name, close_date) VALUES (?, ?, ?, ?)",
            (
                export.id,
                &export.api_key,
                &export.name,
                export.close_date.map(|d| d.to_rfc3339()),
            ),
        )
        .with_context(|| format!("Failed to register game {}", export.id))?;
        {
            let mut star_stmt = tx.prepare("INSERT INTO stars (game_id, id, x, y) VALUES (?, ?, ?, ?)")?;
            let mut owner_stmt = tx.prepare(
                "INSERT INTO owners (game_id, star_id, tick, player) VALUES (?, ?, ?, ?)",
            )?;
            for (star_id, star) in &export.stars {
                star_stmt.execute((export.id, star_id, star.x, star.y))?;
                for (tick, owner) in &star.owners {
                    owner_stmt.execute((export.id, star_id, tick, owner.player()))?;
                }
            }
        }
        tx.commit()?;

        tracing::info!(
            game_id = export.id,
            stars = export.stars.len(),
            "Imported game {}",
            export.name
        );
        Ok(Game {
            id: export.id,
            name: export.name.clone(),
            api_key: export.api_key.clone(),
            close_date: export.close_date,
        })
    }

    /// The game with every star and its ownership history.
    pub fn export_game(&self, id: GameId) -> Result<Option<GameExport>> {
        let Some(game) = self.get_game(id)? else {
            return Ok(None);
        };

        let mut stars: BTreeMap<StarId, StarExport> = self
            .get_stars(id)?
            .into_iter()
            .map(|s| {
                (
                    s.id,
                    StarExport {
                        x: s.x,
                        y: s.y,
                        owners: BTreeMap::new(),
                    },
                )
            })
            .collect();

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT star_id, tick, player FROM owners WHERE game_id = ? ORDER BY star_id, tick",
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, StarId>(0)?,
                    row.get::<_, Tick>(1)?,
                    row.get::<_, Option<PlayerId>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (star_id, tick, player) in rows {
            if let Some(star) = stars.get_mut(&star_id) {
                star.owners.insert(tick, Owner::from(player));
            }
        }

        Ok(Some(GameExport {
            id: game.id,
            name: game.name,
            api_key: game.api_key,
            close_date: game.close_date,
            stars,
        }))
    }
}

impl DataProvider for Database {
    fn resolve_game(&self, game_id: GameId) -> Result<Option<GameMeta>> {
        let Some(game) = self.get_game(game_id)? else {
            return Ok(None);
        };
        let Some((first_tick, last_tick)) = self.get_tick_range(game_id)? else {
            return Ok(None);
        };
        Ok(Some(GameMeta {
            id: game.id,
            name: game.name,
            stars: self.get_stars(game_id)?,
            first_tick,
            last_tick,
        }))
    }

    fn tick_diff(&self, game_id: GameId, tick: Tick) -> Result<Vec<OwnershipEvent>> {
        self.get_owners_at(game_id, tick)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// `<data_dir>/np-timelapse.db` for the current user.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "np-timelapse")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("np-timelapse.db"))
}

fn parse_datetime(s: String) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
