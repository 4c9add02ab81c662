use serde::{Deserialize, Serialize};

/// Tax rates in basis points (1 bp = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    /// Goods circulation tax, charged on parts.
    pub icms_bps: u32,
    /// Municipal service tax, charged on labour.
    pub iss_bps: u32,
    pub pis_bps: u32,
    pub cofins_bps: u32,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            icms_bps: 1_800,
            iss_bps: 500,
            pis_bps: 65,
            cofins_bps: 300,
        }
    }
}

/// Estimated tax figures for one invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxEstimate {
    pub products_base: u64,
    pub icms: u64,
    pub services_base: u64,
    pub iss: u64,
    pub pis: u64,
    pub cofins: u64,
}

impl TaxEstimate {
    pub fn total(&self) -> u64 {
        self.icms + self.iss + self.pis + self.cofins
    }
}

/// `amount * bps / 10_000`, rounded half up.
fn apply_rate(amount: u64, bps: u32) -> u64 {
    let scaled = u128::from(amount) * u128::from(bps) + 5_000;
    (scaled / 10_000) as u64
}

impl TaxRates {
    /// ICMS on parts, ISS on labour, PIS and COFINS on the invoice total.
    pub fn estimate(&self, products_base: u64, services_base: u64, invoice_total: u64) -> TaxEstimate {
        TaxEstimate {
            products_base,
            icms: apply_rate(products_base, self.icms_bps),
            services_base,
            iss: apply_rate(services_base, self.iss_bps),
            pis: apply_rate(invoice_total, self.pis_bps),
            cofins: apply_rate(invoice_total, self.cofins_bps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rates_on_round_amounts() {
        let est = TaxRates::default().estimate(10_000, 20_000, 30_000);
        assert_eq!(est.icms, 1_800);
        assert_eq!(est.iss, 1_000);
        assert_eq!(est.pis, 195);
        assert_eq!(est.cofins, 900);
        assert_eq!(est.total(), 3_895);
    }

    #[test]
    fn rounding_is_half_up() {
        // 150 * 0.65% = 0.975 -> 1
        assert_eq!(apply_rate(150, 65), 1);
        // 70 * 0.65% = 0.455 -> 0
        assert_eq!(apply_rate(70, 65), 0);
        assert_eq!(apply_rate(0, 1_800), 0);
    }
}
