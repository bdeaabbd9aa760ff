//! # Dummy Treasury Blueprint
//! Values every quote token at a fixed rate per unit and reports a settable payout token supply.

use scrypto::prelude::*;

#[blueprint]
mod dummy_treasury_component {
    enable_method_auth! {
        methods {
            asset_value => PUBLIC;
            base_supply => PUBLIC;
            set_value_per_unit => restrict_to: [OWNER];
            set_base_supply => restrict_to: [OWNER];
        }
    }

    pub struct Treasury {
        value_per_unit: Decimal,
        base_supply: Decimal,
    }

    impl Treasury {
        pub fn instantiate_treasury(value_per_unit: Decimal, base_supply: Decimal) -> Global<Treasury> {
            Self {
                value_per_unit,
                base_supply,
            }
            .instantiate()
            .prepare_to_globalize(OwnerRole::None)
            .globalize()
        }

        pub fn asset_value(&self, _resource: ResourceAddress, amount: Decimal) -> Decimal {
            amount * self.value_per_unit
        }

        pub fn base_supply(&self) -> Decimal {
            self.base_supply
        }

        pub fn set_value_per_unit(&mut self, value_per_unit: Decimal) {
            self.value_per_unit = value_per_unit;
        }

        pub fn set_base_supply(&mut self, base_supply: Decimal) {
            self.base_supply = base_supply;
        }
    }
}
