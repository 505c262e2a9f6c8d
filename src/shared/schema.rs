diesel::table! {
    companies (id) {
        id -> Int8,
        name -> Text,
        document -> Nullable<Text>,
        domain -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Int8,
        name -> Text,
        company_id -> Nullable<Int8>,
        subdomain -> Nullable<Text>,
        default_funnel_id -> Nullable<Int8>,
        approved -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    accounts (id) {
        id -> Int8,
        product_id -> Int8,
        name -> Text,
        email -> Text,
        phone -> Text,
        domain -> Nullable<Text>,
        document -> Nullable<Text>,
        funnel_id -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    conversation_funnels (id) {
        id -> Int8,
        name -> Text,
        is_default -> Bool,
        auto_assign -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    funnel_steps (id) {
        id -> Int8,
        funnel_id -> Int8,
        name -> Text,
        is_first -> Bool,
        step_order -> Int4,
        assign_to_team -> Bool,
        kanban_code -> Nullable<Text>,
    }
}

diesel::table! {
    funnel_step_messages (id) {
        id -> Int8,
        funnel_step_id -> Int8,
        name -> Text,
        content -> Text,
        shipping_time -> Int4,
        shipping_order -> Int4,
    }
}

diesel::table! {
    contacts (id) {
        id -> Int8,
        account_id -> Int8,
        name -> Text,
        phone -> Nullable<Text>,
        contact_data -> Jsonb,
        external_code -> Nullable<Uuid>,
        external_status -> Nullable<Text>,
        campaign_id -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_sessions (id) {
        id -> Int8,
        account_id -> Int8,
        product_id -> Int8,
        phone -> Text,
        name -> Text,
        funnel_step_id -> Nullable<Int8>,
        inbox_id -> Nullable<Text>,
        conversation_id -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    sent_step_messages (id) {
        id -> Int8,
        user_session_id -> Int8,
        funnel_step_message_id -> Int8,
        sent_at -> Timestamptz,
    }
}

diesel::table! {
    standard_parameters (id) {
        id -> Int8,
        name -> Text,
        default_value -> Nullable<Text>,
        short_description -> Text,
        help_text -> Text,
        onboarding_visible -> Bool,
    }
}

diesel::table! {
    instance_parameters (id) {
        id -> Int8,
        scope -> Text,
        scope_id -> Int8,
        name -> Text,
        value -> Text,
        short_description -> Text,
        help_text -> Text,
        default_value -> Nullable<Text>,
    }
}

diesel::table! {
    users (id) {
        id -> Int8,
        subject -> Text,
        name -> Text,
        email -> Text,
        first_login -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    access_profiles (id) {
        id -> Int8,
        name -> Text,
    }
}

diesel::table! {
    user_access_profiles (id) {
        id -> Int8,
        user_id -> Int8,
        access_profile_id -> Int8,
    }
}

diesel::table! {
    user_accounts (id) {
        id -> Int8,
        user_id -> Int8,
        account_id -> Int8,
    }
}

diesel::joinable!(products -> companies (company_id));
diesel::joinable!(accounts -> products (product_id));
diesel::joinable!(funnel_steps -> conversation_funnels (funnel_id));
diesel::joinable!(funnel_step_messages -> funnel_steps (funnel_step_id));
diesel::joinable!(contacts -> accounts (account_id));
diesel::joinable!(user_sessions -> accounts (account_id));
diesel::joinable!(user_sessions -> products (product_id));
diesel::joinable!(sent_step_messages -> user_sessions (user_session_id));
diesel::joinable!(sent_step_messages -> funnel_step_messages (funnel_step_message_id));
diesel::joinable!(user_access_profiles -> users (user_id));
diesel::joinable!(user_access_profiles -> access_profiles (access_profile_id));
diesel::joinable!(user_accounts -> users (user_id));
diesel::joinable!(user_accounts -> accounts (account_id));

diesel::allow_tables_to_appear_in_same_query!(
    companies,
    products,
    accounts,
    conversation_funnels,
    funnel_steps,
    funnel_step_messages,
    contacts,
    user_sessions,
    sent_step_messages,
    standard_parameters,
    instance_parameters,
    users,
    access_profiles,
    user_access_profiles,
    user_accounts,
);
