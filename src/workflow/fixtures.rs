use serde::Deserialize;

use crate::table_store::{AttrValue, Item};

/// A demo login account. Fixture data only, not real credentials.
#[derive(Debug, Clone)]
pub struct Account {
    pub email: &'static str,
    pub user_name: &'static str,
    pub password: &'static str,
}

pub const ACCOUNTS: [Account; 10] = [
    Account { email: "user1@example.com", user_name: "TestUser1", password: "012345" },
    Account { email: "user2@example.com", user_name: "TestUser2", password: "123456" },
    Account { email: "user3@example.com", user_name: "TestUser3", password: "234567" },
    Account { email: "user4@example.com", user_name: "TestUser4", password: "345678" },
    Account { email: "user5@example.com", user_name: "TestUser5", password: "456789" },
    Account { email: "user6@example.com", user_name: "TestUser6", password: "567890" },
    Account { email: "user7@example.com", user_name: "TestUser7", password: "678901" },
    Account { email: "user8@example.com", user_name: "TestUser8", password: "789012" },
    Account { email: "user9@example.com", user_name: "TestUser9", password: "890123" },
    Account { email: "user10@example.com", user_name: "TestUser10", password: "901234" },
];

impl Account {
    pub fn to_item(&self) -> Item {
        Item::from([
            ("email".to_string(), AttrValue::S(self.email.to_string())),
            (
                "user_name".to_string(),
                AttrValue::S(self.user_name.to_string()),
            ),
            (
                "password".to_string(),
                AttrValue::S(self.password.to_string()),
            ),
        ])
    }
}

/// One catalog entry from the descriptor file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub artist: String,
    pub year: i64,
    pub web_url: String,
    pub img_url: String,
}

impl CatalogEntry {
    pub fn to_item(&self) -> Item {
        Item::from([
            ("title".to_string(), AttrValue::S(self.title.clone())),
            ("artist".to_string(), AttrValue::S(self.artist.clone())),
            ("year".to_string(), AttrValue::N(self.year.to_string())),
            ("web_url".to_string(), AttrValue::S(self.web_url.clone())),
            ("img_url".to_string(), AttrValue::S(self.img_url.clone())),
        ])
    }

    /// Storage key for the image: the final path segment of its URL.
    pub fn image_key(&self) -> &str {
        self.img_url
            .rsplit('/')
            .next()
            .unwrap_or(self.img_url.as_str())
    }
}

/// Descriptor files come in two shapes: an object wrapping the list under
/// `songs`, or a bare top-level list.
#[derive(Deserialize)]
#[serde(untagged)]
enum Descriptor {
    Wrapped { songs: Vec<CatalogEntry> },
    Bare(Vec<CatalogEntry>),
}

pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let descriptor: Descriptor = serde_json::from_str(json)?;
    Ok(match descriptor {
        Descriptor::Wrapped { songs } => songs,
        Descriptor::Bare(entries) => entries,
    })
}
