use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod app;
mod cmd;
mod shell;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values feed clap's env fallbacks too
    dotenv::dotenv().ok();
    let args = cmd::Cli::parse();
    args.execute().await
}
