// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal keyboard as a stand-in control surface.
//!
//! Layout:
//! - `1`-`8`: step keys
//! - Space: encoder push
//! - Up/Right, Down/Left: encoder turn
//! - Tab: latch the encoder push (for terminals without key release events)
//! - Shift+`1`-`8`: latch a step key the same way
//! - `q`, Ctrl+C: quit
//!
//! Terminals that report key releases give real press and release edges.
//! Everywhere else a press is followed by a synthetic release on the next
//! frame, and the latches stand in for holding.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, execute, queue};
use tracing::{debug, warn};

use super::input::{EncoderEdge, InputFrame, KeyEdge};

const SHIFTED_DIGITS: [char; 8] = ['!', '@', '#', '$', '%', '^', '&', '*'];

/// One decoded control-surface input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceInput {
    Turn(i32),
    Encoder(EncoderEdge),
    Key(KeyEdge),
    Quit,
}

/// Translates terminal key events into surface inputs
#[derive(Debug, Clone, Default)]
pub struct KeyTranslator {
    /// Terminal reports releases
    reports_release: bool,
    encoder_latched: bool,
    latched_key: Option<usize>,
    /// Keys held in release-reporting mode, to drop auto-repeat presses
    held_keys: Vec<usize>,
    encoder_held: bool,
}

impl KeyTranslator {
    pub fn new(reports_release: bool) -> Self {
        Self {
            reports_release,
            ..Default::default()
        }
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }

    pub fn translate(&mut self, key: &KeyEvent) -> Vec<SurfaceInput> {
        let released = key.kind == KeyEventKind::Release;

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                vec![SurfaceInput::Quit]
            }
            KeyCode::Char('q') if !released => vec![SurfaceInput::Quit],

            // Turns repeat while held
            KeyCode::Up | KeyCode::Right if !released => vec![SurfaceInput::Turn(1)],
            KeyCode::Down | KeyCode::Left if !released => vec![SurfaceInput::Turn(-1)],

            KeyCode::Char(' ') => self.encoder(key.kind),
            KeyCode::Tab if !released => {
                self.encoder_latched = !self.encoder_latched;
                let edge = if self.encoder_latched {
                    EncoderEdge::Pressed
                } else {
                    EncoderEdge::Released
                };
                vec![SurfaceInput::Encoder(edge)]
            }

            KeyCode::Char(c @ '1'..='8') => {
                let index = c as usize - '1' as usize;
                self.step_key(index, key.kind)
            }
            KeyCode::Char(c) if !released && SHIFTED_DIGITS.contains(&c) => {
                let index = SHIFTED_DIGITS.iter().position(|d| *d == c).unwrap_or(0);
                self.latch_key(index)
            }

            _ => Vec::new(),
        }
    }

    fn encoder(&mut self, kind: KeyEventKind) -> Vec<SurfaceInput> {
        if !self.reports_release {
            return match kind {
                KeyEventKind::Press => vec![
                    SurfaceInput::Encoder(EncoderEdge::Pressed),
                    SurfaceInput::Encoder(EncoderEdge::Released),
                ],
                _ => Vec::new(),
            };
        }
        match kind {
            KeyEventKind::Press if !self.encoder_held => {
                self.encoder_held = true;
                vec![SurfaceInput::Encoder(EncoderEdge::Pressed)]
            }
            KeyEventKind::Release if self.encoder_held => {
                self.encoder_held = false;
                vec![SurfaceInput::Encoder(EncoderEdge::Released)]
            }
            _ => Vec::new(),
        }
    }

    fn step_key(&mut self, index: usize, kind: KeyEventKind) -> Vec<SurfaceInput> {
        if !self.reports_release {
            return match kind {
                KeyEventKind::Press => vec![
                    SurfaceInput::Key(KeyEdge::Pressed(index)),
                    SurfaceInput::Key(KeyEdge::Released(index)),
                ],
                _ => Vec::new(),
            };
        }
        match kind {
            KeyEventKind::Press if !self.held_keys.contains(&index) => {
                self.held_keys.push(index);
                vec![SurfaceInput::Key(KeyEdge::Pressed(index))]
            }
            KeyEventKind::Release => {
                self.held_keys.retain(|k| *k != index);
                vec![SurfaceInput::Key(KeyEdge::Released(index))]
            }
            _ => Vec::new(),
        }
    }

    fn latch_key(&mut self, index: usize) -> Vec<SurfaceInput> {
        match self.latched_key.take() {
            Some(held) if held == index => vec![SurfaceInput::Key(KeyEdge::Released(index))],
            Some(held) => {
                self.latched_key = Some(index);
                vec![
                    SurfaceInput::Key(KeyEdge::Released(held)),
                    SurfaceInput::Key(KeyEdge::Pressed(index)),
                ]
            }
            None => {
                self.latched_key = Some(index);
                vec![SurfaceInput::Key(KeyEdge::Pressed(index))]
            }
        }
    }
}

/// Inputs waiting to be folded into frames.
///
/// A frame carries at most one encoder edge and one key edge, so a burst of
/// edges is spread over consecutive frames in arrival order.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    pending: VecDeque<SurfaceInput>,
    quit: bool,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: SurfaceInput) {
        if input == SurfaceInput::Quit {
            self.quit = true;
        } else {
            self.pending.push_back(input);
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take the next frame's worth of input
    pub fn next_frame(&mut self) -> InputFrame {
        let mut frame = InputFrame::default();
        while let Some(input) = self.pending.front().copied() {
            match input {
                // A frame is interpreted as turn, then encoder edge, then key edge
                SurfaceInput::Turn(delta) => {
                    if frame.encoder.is_some() || frame.key.is_some() {
                        break;
                    }
                    frame.encoder_delta += delta;
                }
                SurfaceInput::Encoder(edge) => {
                    if frame.encoder.is_some() || frame.key.is_some() {
                        break;
                    }
                    frame.encoder = Some(edge);
                }
                SurfaceInput::Key(edge) => {
                    if frame.key.is_some() {
                        break;
                    }
                    frame.key = Some(edge);
                }
                SurfaceInput::Quit => {}
            }
            self.pending.pop_front();
            if frame.encoder.is_some() && frame.key.is_some() {
                break;
            }
        }
        frame
    }
}

/// Raw-mode terminal driving the interpreter
pub struct TerminalSurface {
    translator: KeyTranslator,
    queue: FrameQueue,
    enhanced: bool,
}

impl TerminalSurface {
    /// Enter raw mode and request key release reporting where supported
    pub fn open() -> io::Result<Self> {
        enable_raw_mode()?;

        let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            warn!("terminal does not report key releases; holds use Tab and Shift+1-8 latches");
        }
        debug!(enhanced, "terminal surface open");

        Ok(Self {
            translator: KeyTranslator::new(enhanced),
            queue: FrameQueue::new(),
            enhanced,
        })
    }

    pub fn quit_requested(&self) -> bool {
        self.queue.quit_requested()
    }

    /// Drain pending terminal events and return the next frame
    pub fn poll(&mut self) -> io::Result<InputFrame> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                for input in self.translator.translate(&key) {
                    self.queue.push(input);
                }
            }
        }
        Ok(self.queue.next_frame())
    }

    /// Rewrite the status line in place
    pub fn show(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout();
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(120);
        let line: String = line.chars().take(width.saturating_sub(1)).collect();
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )?;
        write!(out, "{}", line)?;
        out.flush()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn test_digits_map_to_step_keys() {
        let mut t = KeyTranslator::new(true);
        assert_eq!(
            t.translate(&press(KeyCode::Char('1'))),
            vec![SurfaceInput::Key(KeyEdge::Pressed(0))]
        );
        // Auto-repeat is not a second press
        assert!(t.translate(&press(KeyCode::Char('1'))).is_empty());
        assert_eq!(
            t.translate(&release(KeyCode::Char('1'))),
            vec![SurfaceInput::Key(KeyEdge::Released(0))]
        );
        assert_eq!(
            t.translate(&press(KeyCode::Char('8'))),
            vec![SurfaceInput::Key(KeyEdge::Pressed(7))]
        );
        assert!(t.translate(&press(KeyCode::Char('9'))).is_empty());
    }

    #[test]
    fn test_synthetic_release_without_enhancement() {
        let mut t = KeyTranslator::new(false);
        assert_eq!(
            t.translate(&press(KeyCode::Char(' '))),
            vec![
                SurfaceInput::Encoder(EncoderEdge::Pressed),
                SurfaceInput::Encoder(EncoderEdge::Released)
            ]
        );
    }

    #[test]
    fn test_latches() {
        let mut t = KeyTranslator::new(false);
        assert_eq!(
            t.translate(&press(KeyCode::Tab)),
            vec![SurfaceInput::Encoder(EncoderEdge::Pressed)]
        );
        assert_eq!(
            t.translate(&press(KeyCode::Char('#'))),
            vec![SurfaceInput::Key(KeyEdge::Pressed(2))]
        );
        assert_eq!(
            t.translate(&press(KeyCode::Char('#'))),
            vec![SurfaceInput::Key(KeyEdge::Released(2))]
        );
        assert_eq!(
            t.translate(&press(KeyCode::Tab)),
            vec![SurfaceInput::Encoder(EncoderEdge::Released)]
        );
    }

    #[test]
    fn test_turns_and_quit() {
        let mut t = KeyTranslator::new(true);
        assert_eq!(t.translate(&press(KeyCode::Up)), vec![SurfaceInput::Turn(1)]);
        assert_eq!(t.translate(&press(KeyCode::Left)), vec![SurfaceInput::Turn(-1)]);
        assert!(t.translate(&release(KeyCode::Up)).is_empty());
        assert_eq!(t.translate(&press(KeyCode::Char('q'))), vec![SurfaceInput::Quit]);
    }

    #[test]
    fn test_frame_queue_spreads_edges() {
        let mut queue = FrameQueue::new();
        queue.push(SurfaceInput::Turn(1));
        queue.push(SurfaceInput::Turn(2));
        queue.push(SurfaceInput::Key(KeyEdge::Pressed(0)));
        queue.push(SurfaceInput::Key(KeyEdge::Released(0)));

        let first = queue.next_frame();
        assert_eq!(first.encoder_delta, 3);
        assert_eq!(first.key, Some(KeyEdge::Pressed(0)));

        let second = queue.next_frame();
        assert_eq!(second.encoder_delta, 0);
        assert_eq!(second.key, Some(KeyEdge::Released(0)));
        assert!(queue.is_empty());
        assert!(queue.next_frame().is_idle());
    }

    #[test]
    fn test_frame_queue_keeps_encoder_edge_order() {
        let mut queue = FrameQueue::new();
        queue.push(SurfaceInput::Encoder(EncoderEdge::Pressed));
        queue.push(SurfaceInput::Encoder(EncoderEdge::Released));
        assert_eq!(queue.next_frame().encoder, Some(EncoderEdge::Pressed));
        assert_eq!(queue.next_frame().encoder, Some(EncoderEdge::Released));
    }

    #[test]
    fn test_quit_is_sticky() {
        let mut queue = FrameQueue::new();
        queue.push(SurfaceInput::Quit);
        assert!(queue.quit_requested());
        assert!(queue.is_empty());
    }
}
