//! Unit tests for the Money module

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_inr_is_default_currency() {
        assert_eq!(Currency::default(), Currency::INR);
        assert_eq!(Money::inr(dec!(1)).currency(), Currency::INR);
    }

    #[test]
    fn test_zero_and_positive() {
        assert!(Money::zero(Currency::INR).is_zero());
        assert!(!Money::zero(Currency::INR).is_positive());
        assert!(Money::inr(dec!(0.01)).is_positive());
        assert!(!Money::inr(dec!(-5)).is_positive());
    }

    #[test]
    fn test_currency_parsing_is_case_insensitive() {
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::INR);
        assert_eq!(" usd ".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!("XYZ".parse::<Currency>(), Err(MoneyError::UnknownCurrency(_))));
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_sum_of_premiums() {
        let premiums = vec![
            Money::inr(dec!(12500)),
            Money::inr(dec!(8400.50)),
            Money::inr(dec!(0.50)),
        ];
        let total = Money::sum(Currency::INR, &premiums).unwrap();
        assert_eq!(total.amount(), dec!(20901));
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let total = Money::sum(Currency::INR, &Vec::<Money>::new()).unwrap();
        assert!(total.is_zero());
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let mixed = vec![Money::inr(dec!(1)), Money::new(dec!(1), Currency::GBP)];
        assert!(Money::sum(Currency::INR, &mixed).is_err());
    }

    #[test]
    fn test_multiply_by_frequency_factor() {
        let monthly = Money::inr(dec!(1050.25));
        assert_eq!(monthly.multiply(dec!(12)).amount(), dec!(12603.00));
    }
}

mod formatting {
    use super::*;

    #[test]
    fn test_display_uses_code() {
        assert_eq!(Money::inr(dec!(1500)).to_string(), "INR 1500.00");
    }

    #[test]
    fn test_display_string_negative() {
        assert_eq!(Money::inr(dec!(-1500)).to_display_string(), "-₹1,500.00");
    }

    #[test]
    fn test_display_string_small_amount() {
        assert_eq!(Money::new(dec!(5), Currency::EUR).to_display_string(), "€5.00");
    }
}
