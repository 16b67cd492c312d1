//! Terminal output

use ico_crowdsale::{
    bonus_permille, Address, Balance, Bps, CrowdsaleStatus, FundingSource, PurchaseQuote,
    SaleState, ETHER,
};
use owo_colors::OwoColorize;

const RULE: &str = "═══════════════════════════════════";

/// Wei as ether with trailing zeros trimmed: 1500000000000000000 -> "1.5"
pub fn format_ether(wei: Balance) -> String {
    let whole = wei / ETHER;
    let frac = wei % ETHER;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// 1499 -> "49.9%"
pub fn format_bonus(bps: Bps) -> String {
    let permille = bonus_permille(bps);
    format!("{}.{}%", permille / 10, permille % 10)
}

pub fn header(title: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", RULE.bright_black());
}

pub fn status(status: &CrowdsaleStatus, sale_address: &Address) {
    header("📊 Crowdsale Status");
    let state = match status.state {
        SaleState::Inactive => "inactive".yellow().to_string(),
        SaleState::Active { .. } => "active".green().bold().to_string(),
        SaleState::Finished { .. } => "finished".bright_black().to_string(),
    };
    println!("Controller:      {}", sale_address);
    println!("State:           {}", state);
    if let Some(started_at) = status.state.started_at() {
        println!("Started at:      {}", format_timestamp(started_at));
    }
    if let SaleState::Finished { finished_at, .. } = status.state {
        println!("Finished at:     {}", format_timestamp(finished_at));
    }
    println!("Current bonus:   {}", format_bonus(status.bonus_bps));
    println!("Raised:          {} ETH", format_ether(status.ico_balance).green());
    println!("  direct:        {} ETH", format_ether(status.direct_raised));
    println!("  attested:      {} ETH", format_ether(status.attested_raised));
    println!("Coins issued:    {}", status.coins_issued);
    println!("Founder bonus:   {}", status.founder_allocation);
    println!("Total supply:    {}", status.total_supply.to_string().bold());
    println!();
}

pub fn purchase(quote: &PurchaseQuote, beneficiary: &Address, source: FundingSource) {
    let title = match source {
        FundingSource::Direct => "💰 Contribution Accepted",
        FundingSource::Attested => "💰 Off-chain Contribution Credited",
    };
    header(title);
    println!("Beneficiary:     {}", beneficiary);
    println!("Value:           {} ETH", format_ether(quote.value));
    println!("Bonus:           {}", format_bonus(quote.bonus_bps));
    println!("Tokens minted:   {}", quote.tokens.to_string().green().bold());
    println!();
}

pub fn balance(account: &Address, balance: Balance) {
    header("💰 Balance Query");
    println!("Address: {}", account);
    println!("Balance: {}", balance.to_string().green());
    println!();
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn failure(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
