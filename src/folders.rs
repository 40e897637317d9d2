use chrono::naive::NaiveDateTime;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Folder {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: String,
    pub parent_folder_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl Folder {
    /// Display color used when a folder is created without one
    pub const DEFAULT_COLOR: &'static str = "#3B82F6";
}
