use crate::model::User;
use crate::utils::escape_html;

use super::NO_USERS_MESSAGE;

fn render_card(u: &User) -> String {
    format!(
        r#"        <div class="card" id="user-{id}">
          <img class="avatar" src="{avatar}" alt="{name}"/>
          <div class="card-id">#{id}</div>
          <h3>{name}</h3>
          <p class="email">{email}</p>
        </div>
"#,
        id = u.id,
        avatar = escape_html(u.avatar()),
        name = escape_html(u.display_name()),
        email = escape_html(u.email()),
    )
}

fn render_row(u: &User) -> String {
    format!(
        "            <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        u.id,
        escape_html(u.avatar()),
        escape_html(u.first_name()),
        escape_html(u.last_name()),
        escape_html(u.email()),
    )
}

/// A standalone page with the users as cards followed by the full table.
pub fn render_html(users: &[User]) -> Vec<u8> {
    let body = if users.is_empty() {
        format!(
            "      <p class=\"empty\">{}</p>\n",
            escape_html(NO_USERS_MESSAGE)
        )
    } else {
        let cards: String = users.iter().map(render_card).collect();
        let rows: String = users.iter().map(render_row).collect();
        format!(
            r#"      <section class="cards">
{cards}      </section>

      <section>
        <table>
          <thead>
            <tr><th>ID</th><th>Avatar URL</th><th>First name</th><th>Last name</th><th>Email</th></tr>
          </thead>
          <tbody>
{rows}          </tbody>
        </table>
      </section>
"#
        )
    };

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>Users Report</title>
  <style>
    body {{ font-family: 'Inter', sans-serif; background: #f8fafc; color: #0f172a; margin: 0; }}
    header {{ background: #ffffff; border-bottom: 1px solid #e2e8f0; padding: 1rem 2rem; }}
    main {{ max-width: 1440px; margin: 0 auto; padding: 2.5rem 2rem; }}
    .cards {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 1.25rem; margin-bottom: 2.5rem; }}
    .card {{ background: #ffffff; border: 1px solid #e2e8f0; border-radius: 1rem; padding: 1.25rem; text-align: center; }}
    .avatar {{ width: 96px; height: 96px; border-radius: 9999px; }}
    .card-id {{ color: #64748b; font-size: 0.75rem; font-weight: 700; }}
    .email {{ color: #475569; font-size: 0.875rem; }}
    table {{ width: 100%; border-collapse: collapse; background: #ffffff; }}
    th, td {{ text-align: left; padding: 0.75rem 1rem; border-bottom: 1px solid #f1f5f9; font-size: 0.875rem; }}
    th {{ text-transform: uppercase; letter-spacing: 0.1em; font-size: 0.7rem; }}
    .empty {{ color: #b45309; font-weight: 700; }}
  </style>
</head>
<body>
  <header><h2>Users Report</h2></header>
  <main>
    <p class="total">{total} TOTAL USERS</p>
{body}  </main>
</body>
</html>
"####,
        total = users.len(),
    );

    html.into_bytes()
}
