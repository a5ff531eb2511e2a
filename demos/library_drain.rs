use pagedrain::runner::{Mode, Options, Runner};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(Options {
        mode: Mode::List,
        ..Options::default()
    })?;
    let result = runner.run().await;

    println!("Users: {}", result.users.len());
    for u in result.users.iter() {
        println!("{} {} <{}>", u.id, u.full_name(), u.email());
    }

    Ok(())
}
