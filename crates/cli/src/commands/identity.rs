//! Signed-in identity.
//!
//! Login itself happens in the marketplace; these commands only record the
//! issued user and token, or forget them.

use agritrade_core::{UserId, UserRole};
use agritrade_retailer::RetailerState;
use agritrade_retailer::session::CurrentUser;

pub fn show(state: &RetailerState) {
    match state.identity().current_user() {
        Some(user) => {
            let role = user.role.map_or_else(|| "unknown".to_string(), |r| r.to_string());
            println!("{} (id {}, role {role})", user.name, user.id);
            if let Some(email) = &user.email {
                println!("  {email}");
            }
            if state.identity().token().is_none() && state.config().api.token.is_none() {
                println!("  no bearer token stored");
            }
        }
        None => println!("Not signed in"),
    }
}

pub fn set(
    state: &RetailerState,
    id: UserId,
    name: String,
    email: Option<String>,
    role: UserRole,
    token: Option<&str>,
) -> agritrade_retailer::Result<()> {
    let user = CurrentUser {
        id,
        name,
        email,
        role: Some(role),
    };
    state.identity().remember(&user, token)?;
    println!("Signed in as {} ({role})", user.name);
    Ok(())
}

pub fn logout(state: &RetailerState) -> agritrade_retailer::Result<()> {
    state.logout()?;
    println!("Logged out; cart cleared");
    Ok(())
}
