// Table definitions kept in sync with the cetane migrations in
// src/migrations/. Timestamps are stored as RFC 3339 text.

diesel::table! {
    posts (id) {
        id -> Integer,
        title -> Text,
        content -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    comments (id) {
        id -> Integer,
        post_id -> Integer,
        content -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    results (id) {
        id -> Integer,
        post_id -> Integer,
        content -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    post_ideas (id) {
        id -> Integer,
        post_id -> Integer,
        content -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    todos (id) {
        id -> Integer,
        content -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    posts_text (post_id) {
        post_id -> Integer,
        content -> Text,
        ocr_status -> Text,
        ocr_processed_at -> Nullable<Text>,
        updated_at -> Text,
    }
}

diesel::table! {
    comments_text (comment_id) {
        comment_id -> Integer,
        content -> Text,
        ocr_status -> Text,
        ocr_processed_at -> Nullable<Text>,
        updated_at -> Text,
    }
}

diesel::table! {
    results_text (result_id) {
        result_id -> Integer,
        content -> Text,
        ocr_status -> Text,
        ocr_processed_at -> Nullable<Text>,
        updated_at -> Text,
    }
}

diesel::table! {
    post_ideas_text (idea_id) {
        idea_id -> Integer,
        content -> Text,
        ocr_status -> Text,
        ocr_processed_at -> Nullable<Text>,
        updated_at -> Text,
    }
}

diesel::table! {
    todos_text (todo_id) {
        todo_id -> Integer,
        content -> Text,
        ocr_status -> Text,
        ocr_processed_at -> Nullable<Text>,
        updated_at -> Text,
    }
}

diesel::table! {
    ocr_queue (id) {
        id -> Integer,
        task_type -> Text,
        target_id -> Integer,
        image_url -> Text,
        status -> Text,
        retry_count -> Integer,
        max_retries -> Integer,
        error_message -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
        processed_at -> Nullable<Text>,
    }
}

diesel::table! {
    post_summaries (id) {
        id -> Integer,
        post_id -> Integer,
        main_topic -> Text,
        main_logic -> Text,
        factors -> Text,
        key_concepts -> Text,
        summary -> Text,
        user_main_topic -> Nullable<Text>,
        user_main_logic -> Nullable<Text>,
        user_factors -> Nullable<Text>,
        user_key_concepts -> Nullable<Text>,
        user_summary -> Nullable<Text>,
        ai_supplement_factors -> Nullable<Text>,
        ai_supplement_key_concepts -> Nullable<Text>,
        ai_supplement_summary -> Nullable<Text>,
        ai_model -> Text,
        is_degraded -> Integer,
        last_post_hash -> Nullable<Text>,
        last_post_content_snapshot -> Nullable<Text>,
        last_user_edit_at -> Nullable<Text>,
        generated_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    summary_generation_logs (id) {
        id -> Integer,
        trigger_type -> Text,
        scope -> Text,
        post_id -> Integer,
        summary_type -> Text,
        status -> Text,
        note -> Nullable<Text>,
        started_at -> Text,
        finished_at -> Text,
        duration_sec -> Double,
        content_hash_before -> Nullable<Text>,
        content_hash_after -> Nullable<Text>,
    }
}

diesel::table! {
    scheduler_status (job_name) {
        job_name -> Text,
        last_run_at -> Text,
        next_run_at -> Nullable<Text>,
        last_status -> Text,
        last_duration_sec -> Double,
    }
}

diesel::allow_tables_to_appear_in_same_query!(posts, posts_text);
diesel::allow_tables_to_appear_in_same_query!(comments, comments_text);
diesel::allow_tables_to_appear_in_same_query!(results, results_text);
diesel::allow_tables_to_appear_in_same_query!(post_ideas, post_ideas_text);
diesel::allow_tables_to_appear_in_same_query!(posts, comments);
diesel::allow_tables_to_appear_in_same_query!(posts, results);
diesel::allow_tables_to_appear_in_same_query!(posts, post_ideas);
diesel::allow_tables_to_appear_in_same_query!(posts, post_summaries);
