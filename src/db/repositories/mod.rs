mod signups;
mod tracking;
