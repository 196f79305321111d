use crate::error::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// Parses a cache-size literal as accepted on the simulator command line:
/// a bare integer of bytes, or an integer followed by one of `K`, `M`, `G`,
/// `T` (case-insensitive) for power-of-two multiples.
pub fn parse_cache_size(literal: &str) -> Result<u64, Error> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidCacheSize(literal.to_string()));
    }

    let (digits, multiplier) = match trimmed.chars().last().unwrap() {
        'k' | 'K' => (&trimmed[..trimmed.len() - 1], KIB),
        'm' | 'M' => (&trimmed[..trimmed.len() - 1], MIB),
        'g' | 'G' => (&trimmed[..trimmed.len() - 1], GIB),
        't' | 'T' => (&trimmed[..trimmed.len() - 1], TIB),
        _ => (trimmed, 1),
    };

    digits
        .parse::<u64>()
        .map(|n| n * multiplier)
        .map_err(|_| Error::InvalidCacheSize(literal.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_bytes() {
        assert_eq!(parse_cache_size("1024").unwrap(), 1024);
    }

    #[test]
    fn parses_suffixes() {
        assert_eq!(parse_cache_size("4M").unwrap(), 4 * MIB);
        assert_eq!(parse_cache_size("2G").unwrap(), 2 * GIB);
        assert_eq!(parse_cache_size("1T").unwrap(), TIB);
        assert_eq!(parse_cache_size("16k").unwrap(), 16 * KIB);
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(parse_cache_size(" 4M\n").unwrap(), 4 * MIB);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_cache_size("four megabytes").is_err());
        assert!(parse_cache_size("").is_err());
        assert!(parse_cache_size("M").is_err());
    }
}
