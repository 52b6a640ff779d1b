use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection, SqliteExecutor, SqlitePool,
};

pub const EVERYONE: &str = "Todos";
pub const ARRIVAL: &str = "entra na sala...";
pub const DEPARTURE: &str = "sai da sala";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub last_status: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    PrivateMessage,
    Status,
}

impl MessageType {
    pub const ALL: [MessageType; 3] = [MessageType::Message, MessageType::PrivateMessage, MessageType::Status];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::PrivateMessage => "private_message",
            MessageType::Status => "status",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(anyhow!("unknown message type {s:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub time: String,
}

impl Message {
    pub fn arrival(name: &str, time: String) -> Message {
        Message::status(name, ARRIVAL, time)
    }

    pub fn departure(name: &str, time: String) -> Message {
        Message::status(name, DEPARTURE, time)
    }

    fn status(name: &str, text: &str, time: String) -> Message {
        Message {
            from: name.to_owned(),
            to: EVERYONE.to_owned(),
            text: text.to_owned(),
            kind: MessageType::Status,
            time,
        }
    }
}

type MessageRow = (String, String, String, String, String);

fn message_from_row((from, to, text, kind, time): MessageRow) -> anyhow::Result<Message> {
    Ok(Message {
        from,
        to,
        text,
        kind: kind.parse()?,
        time,
    })
}

/// Handle to the participant and message collections. Cheap to clone, all
/// clones share one pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connects to `url`. An unreachable store is logged and the pool is
    /// created lazily instead, so requests fail until it comes back.
    pub async fn connect(url: &str) -> anyhow::Result<Store> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = match pool_options().connect_with(options.clone()).await {
            Ok(pool) => pool,
            Err(err) => {
                tracing::error!(%err, "couldn't connect to the store");
                pool_options().connect_lazy_with(options)
            }
        };

        Ok(Store { pool })
    }

    /// Private in-memory store on a single pinned connection.
    pub async fn memory() -> anyhow::Result<Store> {
        let pool = pool_options()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Store { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Adds `name` and announces the arrival. Returns `false` without
    /// writing anything if the name is already taken.
    pub async fn register(&self, name: &str, last_status: i64, time: String) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT OR IGNORE INTO participants (name,last_status) VALUES (?,?)")
            .bind(name)
            .bind(last_status)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if inserted == 0 {
            return Ok(false);
        }

        insert_message(&mut *tx, &Message::arrival(name, time)).await?;
        tx.commit().await?;

        Ok(true)
    }

    pub async fn participants(&self) -> anyhow::Result<Vec<Participant>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT name,last_status FROM participants ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, last_status)| Participant { name, last_status })
            .collect())
    }

    pub async fn participant_exists(&self, name: &str) -> anyhow::Result<bool> {
        Ok(sqlx::query("SELECT 1 FROM participants WHERE name=?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .is_some())
    }

    /// Refreshes `lastStatus`. `false` when no such participant.
    pub async fn touch(&self, name: &str, last_status: i64) -> anyhow::Result<bool> {
        let updated = sqlx::query("UPDATE participants SET last_status=? WHERE name=?")
            .bind(last_status)
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated > 0)
    }

    /// Removes `participant` and announces the departure, but only if it
    /// still has the `lastStatus` it was observed with.
    pub async fn evict(&self, participant: &Participant, time: String) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM participants WHERE name=? AND last_status=?")
            .bind(&participant.name)
            .bind(participant.last_status)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }

        insert_message(&mut *tx, &Message::departure(&participant.name, time)).await?;
        tx.commit().await?;

        Ok(true)
    }

    pub async fn insert_message(&self, message: &Message) -> anyhow::Result<()> {
        insert_message(&self.pool, message).await?;
        Ok(())
    }

    /// Everything `user` may read: public and status messages plus anything
    /// from or to them, oldest first.
    pub async fn messages_for(&self, user: &str) -> anyhow::Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT from_name,to_name,text,kind,time FROM messages
            WHERE from_name=? OR to_name=? OR kind=? OR kind=?
            ORDER BY id",
        )
        .bind(user)
        .bind(user)
        .bind(MessageType::Message.as_str())
        .bind(MessageType::Status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    #[cfg(test)]
    pub(crate) async fn all_messages(&self) -> anyhow::Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as("SELECT from_name,to_name,text,kind,time FROM messages ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(message_from_row).collect()
    }
}

/// Every new connection makes sure the collections exist, so a store that
/// was unreachable at startup works as soon as it comes back.
fn pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(16)
        .after_connect(|conn, _meta| Box::pin(async move { bootstrap(conn).await }))
}

async fn bootstrap(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS participants (
            name TEXT PRIMARY KEY NOT NULL,
            last_status INTEGER NOT NULL
        )",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_name TEXT NOT NULL,
            to_name TEXT NOT NULL,
            text TEXT NOT NULL,
            kind TEXT NOT NULL,
            time TEXT NOT NULL
        )",
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_message<'e, E: SqliteExecutor<'e>>(executor: E, message: &Message) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO messages (from_name,to_name,text,kind,time) VALUES (?,?,?,?,?)")
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.text)
        .bind(message.kind.as_str())
        .bind(&message.time)
        .execute(executor)
        .await?;
    Ok(())
}
