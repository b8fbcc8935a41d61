pub mod inspection;
pub mod login;
pub mod logout;
pub mod process;
pub mod reading;
pub mod report;
pub mod school;
pub mod status;
pub mod user;

use rocket::Route;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(inspection::routes());
    routes.extend(login::routes());
    routes.extend(logout::routes());
    routes.extend(process::routes());
    routes.extend(reading::routes());
    routes.extend(report::routes());
    routes.extend(school::routes());
    routes.extend(status::routes());
    routes.extend(user::routes());
    routes
}
