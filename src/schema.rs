//! Warehouse schema definitions
//!
//! This module provides constants for the warehouse database, its table and
//! column names, and the DDL used by schema initialisation. Queries elsewhere
//! in the crate reference these constants instead of repeating string
//! literals.

/// Name of the warehouse database created during schema initialisation
pub const WAREHOUSE_DB: &str = "spark_dwh";

/// Column stamped on every warehouse row at insert time
pub const LAST_UPDATED_AT: &str = "last_updated_at";

/// Sanitized users table schema
pub mod users_raw {
    /// Table name
    pub const TABLE: &str = "users_raw";
    /// External user identifier column
    pub const USER_ID: &str = "user_id";
    /// Record creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Record update timestamp column
    pub const UPDATED_AT: &str = "updated_at";
    /// Surrogate city identifier column
    pub const CITY_ID: &str = "city_id";
    /// Country column
    pub const COUNTRY: &str = "country";
    /// Surrogate zipcode identifier column
    pub const ZIPCODE_ID: &str = "zipcode_id";
    /// Email domain column (local part is stripped before load)
    pub const EMAIL: &str = "email";
    /// Birth date column
    pub const BIRTH_DATE: &str = "birth_date";
    /// Gender column
    pub const GENDER: &str = "gender";
    /// Smoking flag column
    pub const IS_SMOKING: &str = "is_smoking";
    /// Surrogate profession identifier column
    pub const PROFESSION_ID: &str = "profession_id";
    /// Income column
    pub const INCOME: &str = "income";

    /// DDL for the table
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS users_raw \
        (user_id VARCHAR(255), created_at VARCHAR(255), \
         updated_at VARCHAR(255), city_id VARCHAR(255), \
         country VARCHAR(255), zipcode_id VARCHAR(255), \
         email VARCHAR(255), birth_date VARCHAR(255), \
         gender VARCHAR(10), is_smoking VARCHAR(255), \
         profession_id VARCHAR(255), income VARCHAR(255), \
         last_updated_at VARCHAR(255))";
}

/// Subscriptions table schema
pub mod subscriptions_raw {
    /// Table name
    pub const TABLE: &str = "subscriptions_raw";
    /// Parent user identifier column
    pub const USER_ID: &str = "user_id";
    /// Record creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Subscription start date column
    pub const START_DATE: &str = "start_date";
    /// Subscription end date column
    pub const END_DATE: &str = "end_date";
    /// Subscription status column
    pub const STATUS: &str = "status";
    /// Subscription amount column
    pub const AMOUNT: &str = "amount";

    /// DDL for the table
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS subscriptions_raw \
        (user_id VARCHAR(255), created_at VARCHAR(255), \
         start_date VARCHAR(255), end_date VARCHAR(255), \
         status VARCHAR(255), amount VARCHAR(255), \
         last_updated_at VARCHAR(255))";
}

/// Messages table schema (message bodies are never stored)
pub mod messages_raw {
    /// Table name
    pub const TABLE: &str = "messages_raw";
    /// Record creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Receiving user identifier column
    pub const RECEIVER_ID: &str = "receiver_id";
    /// Message identifier column
    pub const ID: &str = "id";
    /// Sending user identifier column
    pub const SENDER_ID: &str = "sender_id";

    /// DDL for the table
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS messages_raw \
        (created_at VARCHAR(255), receiver_id VARCHAR(255), \
         id VARCHAR(255), sender_id VARCHAR(255), \
         last_updated_at VARCHAR(255))";
}

/// Access-restricted city mask-ID lookup table
pub mod sensitive_city_ids {
    /// Table name
    pub const TABLE: &str = "sensitive_city_ids";
    /// Auto-increment surrogate ID column
    pub const ID: &str = "id";
    /// Raw city value column
    pub const CITY: &str = "city";

    /// DDL for the table
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS sensitive_city_ids \
        (id INT AUTO_INCREMENT, city VARCHAR(255), \
         last_updated_at VARCHAR(255), PRIMARY KEY (id))";
}

/// Access-restricted zipcode mask-ID lookup table
pub mod sensitive_zipcode_ids {
    /// Table name
    pub const TABLE: &str = "sensitive_zipcode_ids";
    /// Auto-increment surrogate ID column
    pub const ID: &str = "id";
    /// Raw zipcode value column
    pub const ZIPCODE: &str = "zipcode";

    /// DDL for the table
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS sensitive_zipcode_ids \
        (id INT AUTO_INCREMENT, zipcode VARCHAR(255), \
         last_updated_at VARCHAR(255), PRIMARY KEY (id))";
}

/// Access-restricted profession mask-ID lookup table
pub mod sensitive_profession_ids {
    /// Table name
    pub const TABLE: &str = "sensitive_profession_ids";
    /// Auto-increment surrogate ID column
    pub const ID: &str = "id";
    /// Raw profession value column
    pub const PROFESSION: &str = "profession";

    /// DDL for the table
    pub const CREATE: &str = "CREATE TABLE IF NOT EXISTS sensitive_profession_ids \
        (id INT AUTO_INCREMENT, profession VARCHAR(255), \
         last_updated_at VARCHAR(255), PRIMARY KEY (id))";
}

/// Tables the restricted analyst account is granted access to
pub const ANALYST_TABLES: [&str; 3] = [
    users_raw::TABLE,
    subscriptions_raw::TABLE,
    messages_raw::TABLE,
];

/// All warehouse tables, in creation order
pub const ALL_TABLES: [&str; 6] = [
    users_raw::TABLE,
    subscriptions_raw::TABLE,
    messages_raw::TABLE,
    sensitive_zipcode_ids::TABLE,
    sensitive_city_ids::TABLE,
    sensitive_profession_ids::TABLE,
];

/// DDL statements for all warehouse tables, in creation order
pub const CREATE_TABLE_STATEMENTS: [&str; 6] = [
    users_raw::CREATE,
    subscriptions_raw::CREATE,
    messages_raw::CREATE,
    sensitive_zipcode_ids::CREATE,
    sensitive_city_ids::CREATE,
    sensitive_profession_ids::CREATE,
];
