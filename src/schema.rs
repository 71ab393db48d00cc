diesel::table! {
    roles (id) {
        id -> Integer,
        name -> Text,
        role_type -> VarChar,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> VarChar,
        email -> Text,
        password -> VarChar,
        login_type -> VarChar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    profiles (id) {
        id -> Integer,
        user_id -> Uuid,
        full_name -> Text,
        id_number -> VarChar,
        class_or_position -> Nullable<Text>,
        phone -> Nullable<VarChar>,
        address -> Nullable<Text>,
        guardian_name -> Nullable<Text>,
        guardian_phone -> Nullable<VarChar>,
        bio -> Nullable<Text>,
        photo -> Nullable<Text>,
        qr_id -> VarChar,
        role_type -> VarChar,
    }
}

diesel::table! {
    passes (id) {
        id -> Integer,
        pass_code -> VarChar,
        pass_type -> VarChar,
        status -> VarChar,
        start_date -> Nullable<Timestamp>,
        end_date -> Nullable<Timestamp>,
        created_at -> Timestamp,
        user_id -> Uuid,
    }
}

diesel::table! {
    tickets (id) {
        id -> Integer,
        user_id -> Uuid,
        route_id -> Integer,
        ticket_type -> VarChar,
        price -> Integer,
        payment_status -> VarChar,
        purchase_date -> Timestamp,
        valid_until -> Timestamp,
    }
}

diesel::table! {
    payments (id) {
        id -> Integer,
        user_id -> Uuid,
        pass_id -> Nullable<Integer>,
        ticket_id -> Nullable<Integer>,
        amount -> Integer,
        method -> VarChar,
        reference -> Nullable<Text>,
        proof_url -> Nullable<Text>,
        status -> VarChar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    bus_routes (id) {
        id -> Integer,
        name -> Text,
        stops -> Array<Text>,
        schedule_times -> Array<Text>,
        active -> Bool,
    }
}

diesel::table! {
    buses (id) {
        id -> Integer,
        number_plate -> VarChar,
        from_stop -> Text,
        to_stop -> Text,
        departure -> VarChar,
        arrival -> VarChar,
        total_seats -> Integer,
        route_id -> Nullable<Integer>,
        conductor_id -> Nullable<Uuid>,
        active -> Bool,
    }
}

diesel::table! {
    notifications (id) {
        id -> Integer,
        user_id -> Nullable<Uuid>,
        broadcast_role -> Nullable<VarChar>,
        title -> Text,
        message -> Text,
        kind -> VarChar,
        is_read -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    system_settings (key) {
        key -> VarChar,
        value -> Text,
        value_type -> VarChar,
        category -> VarChar,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    audit_logs (id) {
        id -> Integer,
        actor -> Nullable<Uuid>,
        action -> VarChar,
        subject -> Text,
        outcome -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    pricing_rules (id) {
        id -> Integer,
        ticket_type -> VarChar,
        role_type -> Nullable<VarChar>,
        price -> Integer,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(passes -> users (user_id));
diesel::joinable!(tickets -> users (user_id));
diesel::joinable!(tickets -> bus_routes (route_id));
diesel::joinable!(payments -> users (user_id));
diesel::joinable!(payments -> passes (pass_id));
diesel::joinable!(payments -> tickets (ticket_id));
diesel::joinable!(buses -> bus_routes (route_id));

diesel::allow_tables_to_appear_in_same_query!(
    roles,
    users,
    profiles,
    passes,
    tickets,
    payments,
    bus_routes,
    buses,
    notifications,
    system_settings,
    audit_logs,
    pricing_rules,
);
