use pagedrain::drain;
use pagedrain::model::PageResponse;

#[derive(Debug)]
struct Never;

impl std::fmt::Display for Never {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("never")
    }
}

impl std::error::Error for Never {}

#[tokio::main]
async fn main() {
    // Three in-memory pages of five numbers each.
    let source = |page: u32| {
        let start = (page - 1) * 5;
        std::future::ready(Ok::<_, Never>(PageResponse::new(
            page,
            3,
            (start..start + 5).collect(),
        )))
    };

    let numbers: Vec<u32> = drain::drain(&source).await;
    println!("{numbers:?}");
}
