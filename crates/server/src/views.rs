//! HTML pages of the account screens.

use std::fmt::Write as _;

use engine::{AuthType, SignupView, SiteConfig, User, UserOrder, UsersPage};
use quick_xml::escape::escape;

use crate::{
    accounts::SignupForm,
    flash::{Flash, PendingSignup},
};

fn auth_label(auth_type: AuthType) -> &'static str {
    match auth_type {
        AuthType::Database => "Database",
        AuthType::Cas => "CAS",
        AuthType::OpenId => "OpenID",
        AuthType::Ldap => "LDAP",
    }
}

pub(crate) fn layout(site: &SiteConfig, title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash = flash
        .map(|flash| {
            format!(
                r#"<div id="flash" class="{}">{}</div>"#,
                flash.level.as_str(),
                escape(flash.message.as_str())
            )
        })
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{site}::{title}</title></head>\n<body>\n{flash}\n{body}\n</body>\n</html>\n",
        site = escape(site.name.as_str()),
        title = escape(title),
    )
}

fn text_input(name: &str, label: &str, input_type: &str, value: Option<&str>) -> String {
    format!(
        r#"<p><label for="user_{name}">{label}</label><br><input type="{input_type}" id="user_{name}" name="{name}" value="{value}"></p>"#,
        value = escape(value.unwrap_or_default()),
    )
}

fn field_errors(pending: Option<&PendingSignup>) -> String {
    let Some(pending) = pending.filter(|p| !p.errors.is_empty()) else {
        return String::new();
    };
    let items = pending
        .errors
        .iter()
        .fold(String::new(), |mut out, (field, message)| {
            let _ = write!(
                out,
                r#"<li data-field="{}">{}</li>"#,
                escape(field.as_str()),
                escape(message.as_str())
            );
            out
        });
    format!(r#"<div id="errorExplanation"><ul>{items}</ul></div>"#)
}

fn auth_type_select(auth_types: &[AuthType], selected: Option<&str>) -> String {
    let options = auth_types.iter().fold(String::new(), |mut out, auth| {
        let marker = if Some(auth.as_str()) == selected {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<option value="{}"{marker}>{}</option>"#,
            auth.as_str(),
            auth_label(*auth)
        );
        out
    });
    format!(
        r#"<p><label for="user_auth_type">Authentication type</label><br><select id="user_auth_type" name="auth_type">{options}</select></p>"#
    )
}

pub(crate) fn signup_title(view: SignupView) -> &'static str {
    match view {
        SignupView::FirstUser => "Sign up as the admin user",
        SignupView::NewUser => "Sign up a new user",
        SignupView::Closed => "No signups",
    }
}

pub(crate) fn signup(
    site: &SiteConfig,
    form: &SignupForm,
    pending: Option<&PendingSignup>,
) -> String {
    let heading = match form.view {
        SignupView::FirstUser => {
            "Sign up as the admin user. Use this account to manage the other users."
        }
        _ => "Sign up a new user",
    };
    let user = pending.map(|p| &p.user);
    let value = |pick: fn(&api_types::user::UserNew) -> Option<&String>| {
        user.and_then(pick).map(String::as_str)
    };

    let tos = site
        .tos_link()
        .map(|link| {
            format!(
                r#"<p><input type="checkbox" id="approve_tos" name="approve_tos" value="on"> <label for="approve_tos">I accept the <a href="{}">terms of service</a></label></p>"#,
                escape(link)
            )
        })
        .unwrap_or_default();

    let mut body = format!("<h2>{}</h2>\n", escape(heading));
    body.push_str(&field_errors(pending));
    body.push_str(r#"<form id="signup" action="/users" method="post">"#);
    body.push_str(&text_input("login", "Login", "text", value(|u| u.login.as_ref())));
    body.push_str(&text_input("password", "Password", "password", None));
    body.push_str(&text_input(
        "password_confirmation",
        "Confirm password",
        "password",
        None,
    ));
    body.push_str(&text_input(
        "first_name",
        "First name",
        "text",
        value(|u| u.first_name.as_ref()),
    ));
    body.push_str(&text_input(
        "last_name",
        "Last name",
        "text",
        value(|u| u.last_name.as_ref()),
    ));
    body.push_str(&text_input("email", "Email", "email", value(|u| u.email.as_ref())));
    body.push_str(&auth_type_select(
        &form.auth_types,
        value(|u| u.auth_type.as_ref()),
    ));
    body.push_str(&text_input(
        "open_id_url",
        "OpenID URL",
        "url",
        value(|u| u.open_id_url.as_ref()),
    ));
    body.push_str(&tos);
    body.push_str(r#"<p><input type="submit" value="Signup"></p></form>"#);
    body
}

pub(crate) fn no_signup(site: &SiteConfig) -> String {
    let email = escape(site.admin_email.as_str());
    format!(
        r#"<h2>Signups are closed</h2><p id="nosignup">This site does not accept new signups. Please contact the administrator at <a href="mailto:{email}">{email}</a> to request an account.</p>"#
    )
}

pub(crate) fn users_index(page: &UsersPage, order: UserOrder, current: Option<&User>) -> String {
    let rows = page.users.iter().fold(String::new(), |mut out, user| {
        let own = current.is_some_and(|c| c.id == user.id);
        let _ = write!(
            out,
            r#"<tr id="user-{id}"><td>{login}</td><td>{name}</td><td>{email}</td><td>{auth}</td><td>{admin}</td><td>{delete}</td></tr>"#,
            id = user.id,
            login = escape(user.login.as_str()),
            name = escape(user.display_name().as_str()),
            email = escape(user.email.as_deref().unwrap_or_default()),
            auth = auth_label(user.auth_type),
            admin = if user.is_admin { "yes" } else { "no" },
            delete = if own {
                String::new()
            } else {
                format!(
                    r#"<form action="/users/{}" method="post"><input type="hidden" name="_method" value="delete"><input type="submit" value="Delete"></form>"#,
                    user.id
                )
            },
        );
        out
    });

    let header = [
        ("login", "Login"),
        ("last_name", "Name"),
        ("email", "Email"),
        ("auth_type", "Authentication"),
        ("is_admin", "Admin"),
    ]
    .iter()
    .fold(String::new(), |mut out, (column, label)| {
        let _ = write!(out, r#"<th><a href="/users?order={column}">{label}</a></th>"#);
        out
    });

    let pages = (1..=page.pages).fold(String::new(), |mut out, n| {
        if n == page.page {
            let _ = write!(out, "<span class=\"current\">{n}</span> ");
        } else {
            let _ = write!(
                out,
                r#"<a href="/users?order={}&amp;page={n}">{n}</a> "#,
                order.as_str()
            );
        }
        out
    });

    format!(
        r#"<h2>Manage users</h2><p>You have a total of <span id="total_users">{total}</span> users</p><table id="users"><tr>{header}<th></th></tr>{rows}</table><div class="pagination">{pages}</div><p><a href="/users/new">Sign up a new user</a></p>"#,
        total = page.total,
    )
}

pub(crate) fn change_password(user: &User) -> String {
    format!(
        r#"<h2>Change password for {login}</h2><form action="/users/{id}/update_password" method="post">{password}{confirmation}<p><input type="submit" value="Update password"></p></form>"#,
        login = escape(user.login.as_str()),
        id = user.id,
        password = text_input("password", "New password", "password", None),
        confirmation = text_input(
            "password_confirmation",
            "Confirm new password",
            "password",
            None
        ),
    )
}

pub(crate) fn change_auth_type(user: &User, auth_types: &[AuthType]) -> String {
    format!(
        r#"<h2>Change authentication type for {login}</h2><form action="/users/{id}/update_auth_type" method="post">{select}{open_id}<p><input type="submit" value="Change authentication type"></p></form>"#,
        login = escape(user.login.as_str()),
        id = user.id,
        select = auth_type_select(auth_types, Some(user.auth_type.as_str())),
        open_id = text_input(
            "open_id_url",
            "OpenID URL",
            "url",
            user.open_id_url.as_deref()
        ),
    )
}

/// Script answering an XHR delete from the list page.
pub(crate) fn destroy_js(user_id: i32, remaining: u64) -> String {
    format!(
        "var row = document.getElementById(\"user-{user_id}\");\nif (row) {{ row.parentNode.removeChild(row); }}\nvar total = document.getElementById(\"total_users\");\nif (total) {{ total.textContent = \"{remaining}\"; }}\n"
    )
}
