use chrono::naive::NaiveDateTime;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// Credentials of the linked external calendar, reserved for a real
    /// `CalendarSync` implementation
    #[allow(dead_code)]
    pub calendar_token: Option<String>,
    #[allow(dead_code)]
    pub calendar_refresh_token: Option<String>,
    pub created_at: NaiveDateTime,
}
