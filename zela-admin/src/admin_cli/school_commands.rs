use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use zela_api::models::SchoolInput;
use zela_api::orm::school::{delete_school, get_all_schools, insert_school, school_is_referenced};

use super::utils::{confirm, matches_term};

#[derive(Subcommand)]
pub enum SchoolAction {
    #[command(about = "List schools, optionally filtered by search term")]
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
    #[command(about = "Add a new school")]
    Add {
        #[arg(short, long, help = "School name")]
        name: String,
        #[arg(long, help = "City")]
        city: String,
        #[arg(long, help = "State (UF)")]
        state: String,
        #[arg(long, help = "Director name")]
        director: String,
        #[arg(long, help = "Contact phone")]
        phone: String,
        #[arg(long, help = "Contact email")]
        email: String,
        #[arg(long, help = "Polo (zone) number")]
        polo: i32,
    },
    #[command(about = "Remove schools matching search term")]
    Rm {
        #[arg(
            help = "Search term to match schools for removal (regex by default, use -F for fixed string)"
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

pub fn handle_school_command_with_conn(
    conn: &mut SqliteConnection,
    action: SchoolAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SchoolAction::Ls {
            search_term,
            fixed_string,
        } => {
            school_ls_impl(conn, search_term, fixed_string)?;
        }
        SchoolAction::Add {
            name,
            city,
            state,
            director,
            phone,
            email,
            polo,
        } => {
            school_add_impl(conn, name, city, state, director, phone, email, polo)?;
        }
        SchoolAction::Rm {
            search_term,
            fixed_string,
            yes,
        } => {
            school_rm_impl(conn, search_term, fixed_string, yes)?;
        }
    }
    Ok(())
}

pub fn school_ls_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schools = get_all_schools(conn)?;

    let filtered_schools = if let Some(term) = search_term {
        let mut matched = Vec::new();
        for school in schools {
            if matches_term(&school.name, &term, fixed_string)? {
                matched.push(school);
            }
        }
        matched
    } else {
        schools
    };

    if filtered_schools.is_empty() {
        println!("No schools found.");
    } else {
        println!("Schools:");
        for school in filtered_schools {
            println!(
                "  ID: {}, Name: {}, City: {}/{}, Polo: {}, Director: {}",
                school.id, school.name, school.city, school.state, school.polo,
                school.director_name
            );
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn school_add_impl(
    conn: &mut SqliteConnection,
    name: String,
    city: String,
    state: String,
    director: String,
    phone: String,
    email: String,
    polo: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let created = insert_school(
        conn,
        SchoolInput {
            name,
            city,
            state,
            director_name: director,
            phone,
            email,
            polo,
        },
    )?;

    println!("School created successfully!");
    println!("ID: {}", created.id);
    println!("Name: {}", created.name);
    println!("Polo: {}", created.polo);

    Ok(())
}

pub fn school_rm_impl(
    conn: &mut SqliteConnection,
    search_term: String,
    fixed_string: bool,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schools = get_all_schools(conn)?;

    let mut matching_schools = Vec::new();
    for school in schools {
        if matches_term(&school.name, &search_term, fixed_string)? {
            matching_schools.push(school);
        }
    }

    if matching_schools.is_empty() {
        println!("No schools found matching the search term.");
        return Ok(());
    }

    println!(
        "Found {} school(s) matching the search term:",
        matching_schools.len()
    );
    for school in &matching_schools {
        println!("  ID: {}, Name: {}", school.id, school.name);
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} school(s)?",
            matching_schools.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for school in matching_schools {
        match school_is_referenced(conn, school.id) {
            Ok(true) => {
                errors.push(format!(
                    "School {} (ID: {}) still has linked users, processes or readings",
                    school.name, school.id
                ));
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                errors.push(format!(
                    "Failed to check school {} (ID: {}): {}",
                    school.name, school.id, e
                ));
                continue;
            }
        }

        match delete_school(conn, school.id) {
            Ok(true) => {
                deleted_count += 1;
                println!("Deleted school: {} (ID: {})", school.name, school.id);
            }
            Ok(false) => {}
            Err(e) => {
                errors.push(format!(
                    "Failed to delete school {} (ID: {}): {}",
                    school.name, school.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} school(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed (schools with linked records cannot be removed)".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zela_api::orm::testing::{sample_school_input, setup_test_db};

    #[test]
    fn test_school_add_and_ls() {
        let mut conn = setup_test_db();

        school_add_impl(
            &mut conn,
            "EM Castro Alves".to_string(),
            "Porto Velho".to_string(),
            "RO".to_string(),
            "Carla Souza".to_string(),
            "(69) 3200-1111".to_string(),
            "castroalves@escola.example".to_string(),
            4,
        )
        .expect("school creation should succeed");

        let schools = get_all_schools(&mut conn).unwrap();
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].name, "EM Castro Alves");
        assert_eq!(schools[0].polo, 4);

        assert!(school_ls_impl(&mut conn, Some("Castro".to_string()), true).is_ok());
    }

    #[test]
    fn test_school_rm_impl() {
        let mut conn = setup_test_db();
        insert_school(&mut conn, sample_school_input("EM Removivel", 1)).unwrap();
        insert_school(&mut conn, sample_school_input("EM Permanente", 1)).unwrap();

        school_rm_impl(&mut conn, "Removivel".to_string(), true, true).unwrap();

        let remaining = get_all_schools(&mut conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "EM Permanente");
    }

    #[test]
    fn test_school_rm_impl_no_matches() {
        let mut conn = setup_test_db();
        insert_school(&mut conn, sample_school_input("EM Unica", 1)).unwrap();

        school_rm_impl(&mut conn, "Inexistente".to_string(), true, true).unwrap();
        assert_eq!(get_all_schools(&mut conn).unwrap().len(), 1);
    }
}
