use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use zela_api::models::{ROLE_DISTRICT, ROLE_SCHOOL, UserInput, is_valid_role};
use zela_api::orm::login::hash_password;
use zela_api::orm::school::get_school_by_id;
use zela_api::orm::user::{
    delete_user, get_user_by_email, insert_user, list_all_users, update_user,
};

use super::utils::{confirm, matches_term, prompt_for_password};

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "Add a new user")]
    Add {
        #[arg(short, long, help = "Full name")]
        name: String,
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
        #[arg(short, long, help = "Role: 'district' or 'school'")]
        role: String,
        #[arg(long, help = "Linked school ID (required for school-level users)")]
        school_id: Option<i32>,
    },
    #[command(about = "Change user password")]
    ChangePassword {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(
            short,
            long,
            help = "New password (will be prompted securely if not provided)"
        )]
        password: Option<String>,
    },
    #[command(about = "List users, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
    },
    #[command(about = "Remove users matching search term")]
    Rm {
        #[arg(
            help = "Search term to match users for removal (regex by default, use -F for fixed string)"
        )]
        search_term: String,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_user_command_with_conn(
    conn: &mut SqliteConnection,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Add {
            name,
            email,
            password,
            role,
            school_id,
        } => {
            user_add_impl(conn, name, &email, password, &role, school_id)?;
        }
        UserAction::ChangePassword { email, password } => {
            change_password_impl(conn, &email, password)?;
        }
        UserAction::Ls {
            search_term,
            fixed_string,
        } => {
            user_ls_impl(conn, search_term, fixed_string)?;
        }
        UserAction::Rm {
            search_term,
            fixed_string,
            yes,
        } => {
            user_rm_impl(conn, search_term, fixed_string, yes)?;
        }
    }
    Ok(())
}

pub fn user_add_impl(
    conn: &mut SqliteConnection,
    name: String,
    email: &str,
    password: Option<String>,
    role: &str,
    school_id: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !is_valid_role(role) {
        return Err(format!(
            "Role must be '{}' or '{}', got '{}'",
            ROLE_DISTRICT, ROLE_SCHOOL, role
        )
        .into());
    }
    if role == ROLE_SCHOOL && school_id.is_none() {
        return Err("School-level users must be linked to a school (--school-id)".into());
    }
    if let Some(school_id) = school_id {
        if get_school_by_id(conn, school_id)?.is_none() {
            return Err(format!("School with ID {} does not exist", school_id).into());
        }
    }

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };

    let new_user = UserInput {
        name,
        email: email.to_string(),
        password_hash: hash_password(&password),
        role: role.to_string(),
        school_id,
    };

    let created_user = insert_user(conn, new_user)?;

    println!("User created successfully!");
    println!("ID: {}", created_user.id);
    println!("Email: {}", created_user.email);
    println!("Role: {}", created_user.role);

    Ok(())
}

pub fn change_password_impl(
    conn: &mut SqliteConnection,
    email: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = get_user_by_email(conn, email)?
        .ok_or_else(|| format!("No user with email '{}'", email))?;

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };

    update_user(
        conn,
        user.id,
        None,
        None,
        Some(hash_password(&password)),
        None,
        None,
    )?;

    println!("Password changed successfully for user: {}", email);
    Ok(())
}

pub fn user_ls_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let users = list_all_users(conn)?;

    let filtered_users = if let Some(term) = search_term {
        let mut matched = Vec::new();
        for user in users {
            if matches_term(&user.email, &term, fixed_string)?
                || matches_term(&user.name, &term, fixed_string)?
            {
                matched.push(user);
            }
        }
        matched
    } else {
        users
    };

    if filtered_users.is_empty() {
        println!("No users found.");
    } else {
        println!("Users:");
        for user in filtered_users {
            println!(
                "  ID: {}, Name: {}, Email: {}, Role: {}, School: {}",
                user.id,
                user.name,
                user.email,
                user.role,
                user.school_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    Ok(())
}

pub fn user_rm_impl(
    conn: &mut SqliteConnection,
    search_term: String,
    fixed_string: bool,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let users = list_all_users(conn)?;

    let mut matching_users = Vec::new();
    for user in users {
        if matches_term(&user.email, &search_term, fixed_string)? {
            matching_users.push(user);
        }
    }

    if matching_users.is_empty() {
        println!("No users found matching the search term.");
        return Ok(());
    }

    println!("Found {} user(s) matching the search term:", matching_users.len());
    for user in &matching_users {
        println!("  ID: {}, Email: {}, Role: {}", user.id, user.email, user.role);
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} user(s)?",
            matching_users.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for user in matching_users {
        match delete_user(conn, user.id) {
            Ok(true) => {
                deleted_count += 1;
                println!("Deleted user: {} (ID: {})", user.email, user.id);
            }
            Ok(false) => {}
            Err(e) => {
                errors.push(format!(
                    "Failed to delete user {} (ID: {}): {}",
                    user.email, user.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} user(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zela_api::orm::login::verify_password;
    use zela_api::orm::school::insert_school;
    use zela_api::orm::testing::{sample_school_input, setup_test_db};
    use zela_api::orm::user::get_user_by_email;

    #[test]
    fn test_user_add_impl_hashes_password() {
        let mut conn = setup_test_db();

        user_add_impl(
            &mut conn,
            "Admin".to_string(),
            "cli@zela.local",
            Some("cli_password".to_string()),
            ROLE_DISTRICT,
            None,
        )
        .expect("user creation should succeed");

        let created = get_user_by_email(&mut conn, "cli@zela.local")
            .unwrap()
            .expect("user should exist");
        assert_ne!(created.password_hash, "cli_password");
        assert!(created.password_hash.starts_with("$argon2"));
        assert!(verify_password("cli_password", &created.password_hash));
    }

    #[test]
    fn test_user_add_impl_requires_school_for_school_role() {
        let mut conn = setup_test_db();

        let result = user_add_impl(
            &mut conn,
            "Diretor".to_string(),
            "diretor@zela.local",
            Some("secret".to_string()),
            ROLE_SCHOOL,
            None,
        );
        assert!(result.is_err());

        let school = insert_school(&mut conn, sample_school_input("EM CLI", 1)).unwrap();
        user_add_impl(
            &mut conn,
            "Diretor".to_string(),
            "diretor@zela.local",
            Some("secret".to_string()),
            ROLE_SCHOOL,
            Some(school.id),
        )
        .expect("user creation should succeed");
    }

    #[test]
    fn test_user_add_impl_rejects_unknown_role() {
        let mut conn = setup_test_db();

        let result = user_add_impl(
            &mut conn,
            "Someone".to_string(),
            "someone@zela.local",
            Some("secret".to_string()),
            "superuser",
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_change_password_impl() {
        let mut conn = setup_test_db();

        user_add_impl(
            &mut conn,
            "Admin".to_string(),
            "pwd@zela.local",
            Some("original".to_string()),
            ROLE_DISTRICT,
            None,
        )
        .unwrap();

        let original_hash = get_user_by_email(&mut conn, "pwd@zela.local")
            .unwrap()
            .unwrap()
            .password_hash;

        change_password_impl(&mut conn, "pwd@zela.local", Some("changed".to_string())).unwrap();

        let updated = get_user_by_email(&mut conn, "pwd@zela.local").unwrap().unwrap();
        assert_ne!(updated.password_hash, original_hash);
        assert!(verify_password("changed", &updated.password_hash));
    }

    #[test]
    fn test_change_password_impl_nonexistent_user() {
        let mut conn = setup_test_db();
        let result =
            change_password_impl(&mut conn, "missing@zela.local", Some("pw".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_user_rm_impl_with_regex() {
        let mut conn = setup_test_db();

        for email in ["a@old.local", "b@old.local", "keep@new.local"] {
            user_add_impl(
                &mut conn,
                "User".to_string(),
                email,
                Some("pw".to_string()),
                ROLE_DISTRICT,
                None,
            )
            .unwrap();
        }

        user_rm_impl(&mut conn, "@old\\.local$".to_string(), false, true).unwrap();

        let remaining = list_all_users(&mut conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].email, "keep@new.local");
    }

    #[test]
    fn test_user_ls_impl_invalid_regex() {
        let mut conn = setup_test_db();
        user_add_impl(
            &mut conn,
            "User".to_string(),
            "x@zela.local",
            Some("pw".to_string()),
            ROLE_DISTRICT,
            None,
        )
        .unwrap();
        let result = user_ls_impl(&mut conn, Some("[invalid".to_string()), false);
        assert!(result.is_err());
    }
}
