//! # Dummy Oracle Blueprint
//! Price feed with a settable price, used to drive option and leverage markets in tests.

use scrypto::prelude::*;

#[blueprint]
mod oracle {
    enable_method_auth! {
        methods {
            latest_price => PUBLIC;
            set_price => restrict_to: [OWNER];
        }
    }

    struct Oracle {
        price: Decimal,
    }

    impl Oracle {
        pub fn instantiate_oracle(price: Decimal) -> Global<Oracle> {
            Self { price }
                .instantiate()
                .prepare_to_globalize(OwnerRole::None)
                .metadata(metadata! {
                    init {
                        "name" => "Dummy Price Oracle".to_string(), updatable;
                        "description" => "A dummy oracle used for testing the bond depository".to_string(), updatable;
                    }
                })
                .globalize()
        }

        pub fn latest_price(&self) -> Decimal {
            self.price
        }

        pub fn set_price(&mut self, price: Decimal) {
            self.price = price;
        }
    }
}
