diesel::table! {
    file_metadata (id) {
        id -> Int4,
        file_name -> Text,
        table_name -> Text,
        uploaded_at -> Timestamptz,
        #[sql_name = "primary_key"]
        key_column -> Text,
        details -> Nullable<Jsonb>,
    }
}
