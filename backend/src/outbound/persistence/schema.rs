//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Users asserted by the identity provider.
    users (id) {
        /// Provider subject identifier.
        id -> Text,
        provider -> Text,
        email -> Nullable<Text>,
        name -> Nullable<Text>,
        picture -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Saved diagrams and their share state.
    diagrams (id) {
        id -> Uuid,
        /// Null for guest-created diagrams.
        owner_id -> Nullable<Text>,
        #[max_length = 120]
        title -> Varchar,
        #[max_length = 1000]
        description -> Nullable<Varchar>,
        /// `markup` or `script`.
        mode -> Text,
        code -> Text,
        is_private -> Bool,
        image_ref -> Nullable<Text>,
        share_enabled -> Bool,
        /// Unique across all diagrams.
        share_token -> Nullable<Text>,
        share_expires_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Fixed-window rate-limit counters keyed by signed bucket keys.
    rate_limit_counters (key) {
        key -> Text,
        count -> Int4,
        reset_at -> Timestamptz,
    }
}

diesel::joinable!(diagrams -> users (owner_id));

diesel::allow_tables_to_appear_in_same_query!(users, diagrams, rate_limit_counters);
