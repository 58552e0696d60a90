pub mod guest_info;
pub mod hub_stats;
pub mod weather;
pub mod web_search;

pub use guest_info::GuestInfoTool;
pub use hub_stats::HubStatsTool;
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;
