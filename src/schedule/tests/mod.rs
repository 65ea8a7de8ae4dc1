mod normal;
mod proptests;
mod utils;
