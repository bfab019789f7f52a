//! Order operations.
//!
//! An order's attachments are kept in a single pipe-delimited column.

use chrono::Utc;
use mv_core::{Error, OrderId, Result};
use rusqlite::Connection;

use crate::models::{Order, ORDER_COLUMNS};

const ATTACHMENT_SEPARATOR: char = '|';

/// Decode the attachments column. Empty segments are dropped.
pub fn split_attachments(raw: &str) -> Vec<String> {
    raw.split(ATTACHMENT_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encode attachments for storage.
pub fn join_attachments(names: &[String]) -> String {
    names
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

/// Create an order with no attachments.
pub fn create_order(conn: &Connection, title: &str) -> Result<Order> {
    let id = OrderId::new();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO orders (id, title, attachments, created_at) VALUES (?1, ?2, '', ?3)",
        rusqlite::params![id.to_string(), title, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Order {
        id,
        title: title.to_string(),
        attachments: Vec::new(),
        created_at,
    })
}

/// Get an order by ID.
pub fn get_order(conn: &Connection, id: OrderId) -> Result<Option<Order>> {
    let result = conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
        [id.to_string()],
        Order::from_row,
    );
    match result {
        Ok(o) => Ok(Some(o)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Attachment names of an order, in stored order.
pub fn get_attachments(conn: &Connection, id: OrderId) -> Result<Vec<String>> {
    get_order(conn, id)?
        .map(|o| o.attachments)
        .ok_or_else(|| Error::not_found("order", id))
}

/// Replace the attachment list of an order.
pub fn set_attachments(conn: &Connection, id: OrderId, names: &[String]) -> Result<()> {
    let n = conn
        .execute(
            "UPDATE orders SET attachments = ?1 WHERE id = ?2",
            rusqlite::params![join_attachments(names), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("order", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    #[test]
    fn split_drops_empty_segments() {
        assert_eq!(split_attachments(""), Vec::<String>::new());
        assert_eq!(split_attachments("a.webm"), vec!["a.webm"]);
        assert_eq!(split_attachments("a.webm||b.mp4|"), vec!["a.webm", "b.mp4"]);
    }

    #[test]
    fn join_skips_blank_names() {
        let names = vec!["a.mp4".to_string(), " ".to_string(), "b.m4a".to_string()];
        assert_eq!(join_attachments(&names), "a.mp4|b.m4a");
        assert_eq!(join_attachments(&[]), "");
    }

    #[test]
    fn attachments_roundtrip_through_table() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let order = create_order(&conn, "Kitchen remodel").unwrap();
        assert!(get_attachments(&conn, order.id).unwrap().is_empty());

        let names = vec!["abc.webm".to_string(), "def.jpg".to_string()];
        set_attachments(&conn, order.id, &names).unwrap();

        let got = get_order(&conn, order.id).unwrap().unwrap();
        assert_eq!(got.title, "Kitchen remodel");
        assert_eq!(got.attachments, names);
    }

    #[test]
    fn missing_order_is_not_found() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = OrderId::new();

        assert!(get_order(&conn, id).unwrap().is_none());
        assert!(matches!(get_attachments(&conn, id), Err(Error::NotFound { .. })));
        assert!(matches!(
            set_attachments(&conn, id, &["a".to_string()]),
            Err(Error::NotFound { .. })
        ));
    }
}
