//! Ask a single public SPARQL endpoint a natural-language question and
//! print the result as a tab-separated table.
//!
//! ```sh
//! cargo run --example ask -- "count cats"
//! ```

use sparql_gateway::{EndpointDescriptor, Formatter, Gateway, GatewayConfig, TableFormatter};

#[tokio::main]
async fn main() -> sparql_gateway::Result<()> {
    tracing_subscriber::fmt::init();

    let question = std::env::args().nth(1).unwrap_or_else(|| "list 10 things".to_string());

    let gateway = Gateway::new(GatewayConfig::default());
    let endpoint = EndpointDescriptor::new("https://query.wikidata.org/sparql")
        .with_name("wikidata")
        .with_rate_limit(5.0, 10);

    let answer = gateway.ask(&question, &endpoint).await?;
    print!("{}", TableFormatter.emit(&answer.result));
    Ok(())
}
