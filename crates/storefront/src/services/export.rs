//! CSV export of the inventory.
//!
//! Output follows RFC 4180: CRLF line endings, and fields containing a comma,
//! quote, CR or LF are wrapped in double quotes with inner quotes doubled.

use std::fmt::Write as _;

use crate::models::Item;

/// Header row, in column order.
pub const HEADER: [&str; 9] = [
    "ID",
    "Category",
    "Name",
    "Description",
    "Price",
    "Is Sold",
    "Stock",
    "Created By",
    "Created At",
];

/// Download file name.
pub const FILE_NAME: &str = "items.csv";

/// Timestamp format for the `Created At` column (UTC).
const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render items as CSV, one row per item after the header.
#[must_use]
pub fn items_csv(items: &[Item]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().copied());

    for item in items {
        let id = item.id.to_string();
        let price = item.price.plain();
        let is_sold = if item.is_sold() { "True" } else { "False" };
        let stock = item.stock.to_string();
        let created_at = item.created_at.format(CREATED_AT_FORMAT).to_string();

        push_row(
            &mut out,
            [
                id.as_str(),
                item.category_name.as_str(),
                item.name.as_str(),
                item.description.as_deref().unwrap_or(""),
                price.as_str(),
                is_sold,
                stock.as_str(),
                item.created_by_username.as_str(),
                created_at.as_str(),
            ],
        );
    }

    out
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        let _ = write!(out, "\"{}\"", field.replace('"', "\"\""));
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use bazaar_core::{CategoryId, ItemId, Money, UserId};
    use chrono::{TimeZone, Utc};

    use super::*;

    const HEADER_LINE: &str = "ID,Category,Name,Description,Price,Is Sold,Stock,Created By,Created At\r\n";

    fn item(name: &str, description: Option<&str>, stock: u32) -> Item {
        Item {
            id: ItemId::new(3),
            category_id: CategoryId::new(1),
            category_name: "Home".to_owned(),
            name: name.to_owned(),
            description: description.map(str::to_owned),
            price: Money::from_cents(1999),
            stock,
            created_by: UserId::new(1),
            created_by_username: "ivy".to_owned(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 17, 9, 3, 7).single().unwrap_or_default(),
        }
    }

    #[test]
    fn test_empty_catalog_is_header_only() {
        assert_eq!(items_csv(&[]), HEADER_LINE);
    }

    #[test]
    fn test_plain_row() {
        let csv = items_csv(&[item("Lamp", None, 2)]);
        assert_eq!(
            csv,
            format!("{HEADER_LINE}3,Home,Lamp,,19.99,False,2,ivy,2024-05-17 09:03:07\r\n")
        );
    }

    #[test]
    fn test_sold_item() {
        let csv = items_csv(&[item("Lamp", None, 0)]);
        assert!(csv.contains(",True,0,"));
    }

    #[test]
    fn test_quoting() {
        let csv = items_csv(&[item("Lamp, large", Some("The \"best\"\nlamp"), 1)]);
        assert!(csv.contains("3,Home,\"Lamp, large\",\"The \"\"best\"\"\nlamp\",19.99,"));
    }
}
