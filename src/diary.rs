use chrono::naive::NaiveDate;
use chrono::naive::NaiveDateTime;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct DiaryEntry {
    pub id: i64,
    pub user_id: i64,
    pub folder_id: Option<i64>,
    pub entry_date: NaiveDate,
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<i32>,
    pub weather: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Smallest accepted mood value
pub const MOOD_MIN: i32 = 1;

/// Largest accepted mood value
pub const MOOD_MAX: i32 = 5;
