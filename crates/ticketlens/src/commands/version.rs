pub fn run() -> anyhow::Result<()> {
    println!("ticketlens {}", env!("CARGO_PKG_VERSION"));
    println!("Ticket analysis: field extraction, query generation and prevalence checks");
    Ok(())
}
