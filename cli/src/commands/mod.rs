mod account;
mod catalog;
mod helpers;
mod social;

pub(crate) use account::{
    SettingsChanges, cmd_delete_account, cmd_login, cmd_passwd, cmd_profile, cmd_register,
    cmd_settings,
};
pub(crate) use catalog::{
    cmd_exercise_categories, cmd_exercise_list, cmd_exercise_show, cmd_meal_categories,
    cmd_meal_show, cmd_sync,
};
pub(crate) use helpers::json_error;
pub(crate) use social::{
    cmd_comment_exercise, cmd_comment_meal, cmd_delete_exercise_comment, cmd_delete_meal_comment,
    cmd_favorite_exercise, cmd_favorite_meal, cmd_unfavorite_exercise, cmd_unfavorite_meal,
};
