pub mod carts;
pub mod contact;
pub mod draws;
pub mod newsletter;
pub mod orders;
pub mod payments;
pub mod policies;
pub mod products;
pub mod professions;
pub mod testimonials;
pub mod users;
