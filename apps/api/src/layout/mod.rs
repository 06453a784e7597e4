// Page geometry and text measurement used by the template renderer and the
// export paginator. Everything here is pure and synchronous.

pub mod font_metrics;
pub mod page;
