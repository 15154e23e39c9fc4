pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse a comma-separated seed list. Negative literals fold to their magnitude.
pub fn parse_seeds(s: &str) -> anyhow::Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in split_csv(s) {
        if let Ok(value) = token.parse::<u64>() {
            seeds.push(value);
        } else if let Ok(value) = token.parse::<i64>() {
            seeds.push(value.unsigned_abs());
        } else {
            anyhow::bail!("invalid seed '{token}'");
        }
    }
    if seeds.is_empty() {
        anyhow::bail!("at least one seed is required");
    }
    Ok(seeds)
}
