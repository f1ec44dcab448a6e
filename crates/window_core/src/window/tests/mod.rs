//! Window scenarios driven through a recording mock driver

mod support;

mod events;
mod fullscreen;
mod reparenting;
